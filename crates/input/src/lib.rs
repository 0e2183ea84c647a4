//! Input: platform events translated into engine-level state.
//!
//! # Invariants
//! - Hosts translate platform events into [`InputEvent`]s; nothing here knows about windows.
//! - Per-frame accumulators (wheel) are reset by the frame orchestrator, not by event handling.

pub mod event;
pub mod selection;
pub mod state;

pub use event::{InputEvent, MouseButton};
pub use selection::Selection;
pub use state::InputState;

pub fn crate_info() -> &'static str {
    concat!("planar-input v", env!("CARGO_PKG_VERSION"))
}
