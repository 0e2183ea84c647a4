//! Physics worker: a detached thread owning its own copy of body state.
//!
//! # Invariants
//! - The worker is reachable only through JSON messages on channels; nothing is shared.
//! - Replies to a `start` subscription reuse its correlation id and never expire it.
//! - Collision replies are one-shot and always marked expiring.

mod worker;

pub use worker::{PhysicsWorker, WorkerHandle};

pub fn crate_info() -> &'static str {
    concat!("planar-physics v", env!("CARGO_PKG_VERSION"))
}
