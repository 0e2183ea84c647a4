//! Engine kernel: tick cadence, the physics worker bridge, frame orchestration
//! and the engine context that owns them.
//!
//! # Invariants
//! - A frame body only runs while the tick gate is open; it closes on entry and
//!   reopens when the body completes, so bodies never overlap.
//! - `delta_time` is never negative. Without catch-up, banked lag never shrinks.
//! - Worker requests leave in enqueue order; responses are routed by
//!   correlation id and may arrive in any order, or never.
//! - User callback failures are logged and never stall the cadence.
//! - The physics worker owns its own copy of body state; the engine only sees
//!   it through bulk updates.

pub mod bridge;
pub mod cadence;
pub mod clock;
pub mod commands;
pub mod config;
pub mod debug;
pub mod engine;
pub mod frame;
pub mod gate;
pub mod host;
pub mod scene;
pub mod stats;

pub use bridge::{BridgeError, Continuation, Dispatch, WorkerBridge, WorkerPort};
pub use cadence::{CadenceController, Phase, TickOutcome};
pub use clock::{FrameClock, Timeline};
pub use commands::{Command, Commands};
pub use config::{ConfigError, ConfigValue, EngineConfig, Setting, ValueKind};
pub use debug::{ConsoleEntry, ConsoleHistory, ConsoleLevel, DebugProbe, DebugState};
pub use engine::{Engine, EngineState, InitError, Surface};
pub use frame::{FrameState, RenderPass, RenderStatus, RenderView, Simulation, supervise};
pub use gate::TickGate;
pub use host::{Host, HostError, RunSummary};
pub use scene::{Camera, LAYER_MAX, LAYER_MIN, ObjectKey, SceneError, SceneObject, SceneRegistry};
pub use stats::FrameCosts;

pub fn crate_info() -> &'static str {
    concat!("planar-kernel v", env!("CARGO_PKG_VERSION"))
}
