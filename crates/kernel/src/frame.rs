//! Frame orchestration: the per-tick body run while the gate is closed.
//!
//! Order inside one frame body:
//! 1. user `update` with an immutable [`FrameState`] (supervised)
//! 2. per-frame input accumulators reset
//! 3. recorded [`Commands`] applied
//! 4. worker queue flushed
//! 5. render pass
//! 6. debug probes aged
//!
//! A failing callback never skips the later steps.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use glam::Vec2;
use planar_common::{Body, EntityId};
use planar_input::InputState;

use crate::clock::FrameClock;
use crate::commands::Commands;
use crate::debug::DebugState;
use crate::engine::{Engine, EngineState};
use crate::scene::{Camera, SceneRegistry};

/// Read-only snapshot handed to user callbacks and the render pass.
#[derive(Debug, Clone, Copy)]
pub struct FrameState<'a> {
    pub fps: f64,
    /// Simulated seconds this frame covers.
    pub delta_time: f64,
    /// Wall-clock seconds measured since start.
    pub total_time: f64,
    pub selected: &'a [EntityId],
    pub over: Option<EntityId>,
    pub screen_size: Vec2,
    /// Pointer position in world units.
    pub mouse: Vec2,
    /// Wheel delta accumulated since the previous frame.
    pub wheel: f32,
    pub camera: &'a Camera,
    pub zoom: f64,
    pub input: &'a InputState,
    pub objects: &'a SceneRegistry,
}

impl<'a> FrameState<'a> {
    pub fn capture(state: &'a EngineState, clock: &FrameClock) -> Self {
        Self {
            fps: clock.fps(),
            delta_time: clock.delta_time(),
            total_time: clock.elapsed_ms() / 1000.0,
            selected: state.selection.as_slice(),
            over: state.over,
            screen_size: Vec2::new(state.surface.width, state.surface.height),
            mouse: state.pointer_world,
            wheel: state.input.wheel(),
            camera: &state.camera,
            zoom: state.config.zoom,
            input: &state.input,
            objects: &state.scene,
        }
    }

    pub fn key(&self, code: &str) -> bool {
        self.input.key(code)
    }
}

/// User simulation code driven by the engine.
pub trait Simulation {
    /// Runs once when the engine starts, before the worker is told about the scene.
    fn start(&mut self, frame: &FrameState<'_>, commands: &mut Commands) -> anyhow::Result<()> {
        let _ = (frame, commands);
        Ok(())
    }

    /// Runs once per executed frame body.
    fn update(&mut self, frame: &FrameState<'_>, commands: &mut Commands) -> anyhow::Result<()>;
}

/// Whether a render pass finished with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Output is complete; the next tick may run.
    Presented,
    /// Presentation completes later; the host calls
    /// [`Engine::frame_presented`] when it does.
    Pending,
}

/// Everything a render pass may read.
#[derive(Debug, Clone, Copy)]
pub struct RenderView<'a> {
    pub frame: FrameState<'a>,
    pub debug: &'a DebugState,
    pub bodies: &'a [Body],
    pub background: &'a str,
    pub text_color: &'a str,
    pub show_debug: bool,
}

/// External render seam.
pub trait RenderPass {
    fn render(&mut self, view: &RenderView<'_>) -> RenderStatus;
}

/// Run a user callback, converting errors and panics into a logged failure.
///
/// Returns whether the callback succeeded.
pub fn supervise<F>(context: &'static str, f: F) -> bool
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::error!(context, error = %format!("{err:#}"), "user callback failed");
            false
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(context, panic = %message, "user callback panicked");
            false
        }
    }
}

impl Engine {
    /// Execute one frame body at wall-clock `now_ms`.
    pub(crate) fn run_frame(&mut self, now_ms: f64) {
        let _span = tracing::trace_span!("frame", n = self.frames).entered();
        let started = Instant::now();

        let mut commands = Commands::new();
        if let Some(simulation) = self.simulation.as_mut() {
            let frame = FrameState::capture(&self.state, self.cadence.clock());
            supervise("update", || simulation.update(&frame, &mut commands));
        }
        self.state.input.end_frame();
        self.apply_commands(commands);
        self.flush_worker(now_ms);

        let status = match self.renderer.as_mut() {
            Some(renderer) => {
                let view = RenderView {
                    frame: FrameState::capture(&self.state, self.cadence.clock()),
                    debug: &self.state.debug,
                    bodies: &self.state.bodies,
                    background: &self.state.config.background,
                    text_color: &self.state.config.text_color,
                    show_debug: self.state.config.debug,
                };
                renderer.render(&view)
            }
            None => RenderStatus::Presented,
        };
        self.state.debug.tick_probes();

        self.frames += 1;
        self.frame_costs.record(started.elapsed());
        if status == RenderStatus::Presented {
            self.cadence.finish_frame();
        }
    }
}
