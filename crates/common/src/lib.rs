//! Shared types for the planar engine: object identity, body state, and the
//! message protocol spoken across the physics worker boundary.

pub mod protocol;
pub mod types;

pub use glam::Vec2;
pub use protocol::{
    CorrelationId, InboundMessage, OutboundMessage, ProtocolError, Request, Response,
    ResponseData,
};
pub use types::{Body, Collider, EntityId};

pub fn crate_info() -> &'static str {
    concat!("planar-common v", env!("CARGO_PKG_VERSION"))
}
