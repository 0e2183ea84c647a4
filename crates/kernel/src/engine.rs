use glam::Vec2;
use planar_common::{Body, Collider, EntityId, Request, Response};
use planar_input::{InputEvent, InputState, MouseButton, Selection};

use crate::bridge::{Dispatch, WorkerBridge, WorkerPort};
use crate::cadence::{CadenceController, Phase, TickOutcome};
use crate::clock::FrameClock;
use crate::commands::{Command, Commands};
use crate::config::{ConfigError, ConfigValue, EngineConfig, Setting};
use crate::debug::{ConsoleLevel, DebugProbe, DebugState};
use crate::frame::{FrameState, RenderPass, Simulation, supervise};
use crate::scene::{Camera, ObjectKey, SceneError, SceneObject, SceneRegistry};
use crate::stats::{DEFAULT_WINDOW, FrameCosts};

/// Side length of the pointer's collision probe, in world units.
const POINTER_PROBE_SIZE: f32 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("invalid render surface {width}x{height}")]
    InvalidSurface { width: f32, height: f32 },
    #[error("engine is already running")]
    AlreadyRunning,
}

/// Size of the surface the engine renders onto, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn validate(&self) -> Result<(), InitError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(InitError::InvalidSurface {
                width: self.width,
                height: self.height,
            })
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// State worker continuations may touch.
///
/// Mutated only on the engine's thread: by frame bodies, by input handling,
/// and by continuations run from [`Engine::on_worker_message`].
#[derive(Debug)]
pub struct EngineState {
    pub(crate) config: EngineConfig,
    pub(crate) scene: SceneRegistry,
    pub(crate) input: InputState,
    pub(crate) selection: Selection,
    pub(crate) over: Option<EntityId>,
    pub(crate) camera: Camera,
    pub(crate) pointer_probe: Body,
    pub(crate) pointer_world: Vec2,
    pub(crate) bodies: Vec<Body>,
    pub(crate) debug: DebugState,
    pub(crate) surface: Surface,
}

impl EngineState {
    fn new(config: EngineConfig) -> Self {
        let debug = DebugState::new(config.console_capacity);
        Self {
            config,
            scene: SceneRegistry::new(),
            input: InputState::new(),
            selection: Selection::new(),
            over: None,
            camera: Camera::default(),
            pointer_probe: pointer_probe(),
            pointer_world: Vec2::ZERO,
            bodies: Vec::new(),
            debug,
            surface: Surface::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneRegistry {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneRegistry {
        &mut self.scene
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Object currently under the pointer, as last reported by the worker.
    pub fn over(&self) -> Option<EntityId> {
        self.over
    }

    pub fn set_hovered(&mut self, entity: Option<EntityId>) {
        self.over = entity;
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn pointer_world(&self) -> Vec2 {
        self.pointer_world
    }

    pub fn pointer_probe(&self) -> &Body {
        &self.pointer_probe
    }

    /// Authoritative body list, as last reported by the worker.
    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Replace the body list and copy positions back onto scene objects.
    pub fn replace_bodies(&mut self, bodies: Vec<Body>) {
        self.scene.apply_bodies(&bodies);
        self.bodies = bodies;
    }

    pub fn debug(&self) -> &DebugState {
        &self.debug
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }
}

fn pointer_probe() -> Body {
    Body::new(EntityId::new(), Vec2::ZERO).with_collider(Collider::Box {
        half_extents: Vec2::splat(POINTER_PROBE_SIZE / 2.0),
    })
}

/// The engine context: owns every piece of mutable engine state.
///
/// Lifecycle is [`new`](Self::new) → [`start`](Self::start) →
/// [`tick`](Self::tick)... → [`teardown`](Self::teardown). Nothing here is
/// global; hosts own the engine and drive it.
pub struct Engine {
    pub(crate) state: EngineState,
    pub(crate) bridge: WorkerBridge<EngineState>,
    pub(crate) cadence: CadenceController,
    pub(crate) frame_costs: FrameCosts,
    pub(crate) frames: u64,
    pub(crate) simulation: Option<Box<dyn Simulation>>,
    pub(crate) renderer: Option<Box<dyn RenderPass>>,
    port: Option<Box<dyn WorkerPort>>,
    worker_lost: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bridge = WorkerBridge::new(config.correlation_prefix.clone(), config.request_timeout_ms);
        let cadence = CadenceController::new(&config);
        let frame_costs = FrameCosts::new(DEFAULT_WINDOW, cadence.tick_interval());
        Ok(Self {
            state: EngineState::new(config),
            bridge,
            cadence,
            frame_costs,
            frames: 0,
            simulation: None,
            renderer: None,
            port: None,
            worker_lost: false,
        })
    }

    /// Start the engine on `surface` at wall-clock `now_ms`.
    ///
    /// Runs the simulation's `start` callback, then registers gravity and the
    /// scene's bodies with the worker and flushes immediately.
    pub fn start<S, R, P>(
        &mut self,
        surface: Surface,
        simulation: S,
        renderer: R,
        port: P,
        now_ms: f64,
    ) -> Result<(), InitError>
    where
        S: Simulation + 'static,
        R: RenderPass + 'static,
        P: WorkerPort + 'static,
    {
        if self.cadence.phase() != Phase::Stopped {
            tracing::warn!("start called on a running engine");
            return Err(InitError::AlreadyRunning);
        }
        if let Err(err) = surface.validate() {
            tracing::error!(error = %err, "engine failed to initialize");
            return Err(err);
        }

        self.state.surface = surface;
        self.state.camera = Camera::default();
        self.state.pointer_probe = pointer_probe();
        self.state.over = None;
        self.simulation = Some(Box::new(simulation));
        self.renderer = Some(Box::new(renderer));
        self.port = Some(Box::new(port));
        self.worker_lost = false;
        self.cadence.start(now_ms);

        let mut commands = Commands::new();
        if let Some(simulation) = self.simulation.as_mut() {
            let frame = FrameState::capture(&self.state, self.cadence.clock());
            supervise("start", || simulation.start(&frame, &mut commands));
        }
        self.apply_commands(commands);

        self.bridge.send(Request::SetGravity {
            value: self.state.config.gravity,
        });
        let bodies = self.state.scene.bodies();
        self.state.bodies = bodies.clone();
        self.bridge.subscribe(
            Request::Start {
                bodies,
                delta: Vec2::ZERO,
            },
            |state: &mut EngineState, response| {
                if let Response::Bodies { bodies } = response {
                    state.replace_bodies(bodies.clone());
                }
            },
        );
        self.flush_worker(now_ms);

        tracing::info!(
            width = surface.width,
            height = surface.height,
            objects = self.state.scene.len(),
            max_rate = self.state.config.max_rate,
            "engine started"
        );
        Ok(())
    }

    /// Stop the engine and drop every queued request and pending continuation.
    pub fn teardown(&mut self) {
        if self.cadence.phase() == Phase::Stopped {
            return;
        }
        self.cadence.stop();
        self.bridge.clear();
        self.simulation = None;
        self.renderer = None;
        self.port = None;
        tracing::info!(
            frames = self.frames,
            lost = self.cadence.clock().loss_count(),
            "engine stopped"
        );
    }

    /// Handle one scheduled tick. Runs a frame body when the cadence allows it.
    pub fn tick(&mut self, now_ms: f64) -> TickOutcome {
        let outcome = self.cadence.tick(now_ms);
        if let TickOutcome::Frame(_) = outcome {
            self.run_frame(now_ms);
        }
        outcome
    }

    /// The host discarded its tick source after a watchdog restart.
    pub fn timer_torn_down(&mut self) {
        self.cadence.timer_torn_down();
    }

    /// The host armed a fresh tick source.
    pub fn rearm(&mut self) {
        self.cadence.rearm();
    }

    /// A render pass that returned `Pending` has finished presenting.
    pub fn frame_presented(&mut self) {
        self.cadence.finish_frame();
    }

    /// Route a raw message from the worker to its continuation.
    pub fn on_worker_message(&mut self, text: &str) -> Dispatch {
        self.bridge.on_raw(text, &mut self.state)
    }

    /// Route a decoded worker message to its continuation.
    pub fn on_response(&mut self, message: &planar_common::InboundMessage) -> Dispatch {
        self.bridge.on_response(message, &mut self.state)
    }

    /// Fold a platform input event into engine state.
    pub fn handle_input(&mut self, event: &InputEvent) {
        self.state.input.apply(event);
        match event {
            InputEvent::PointerMoved { x, y } => {
                let state = &mut self.state;
                let world = state.camera.screen_to_world(
                    Vec2::new(*x, *y),
                    state.surface.height,
                    state.config.zoom as f32,
                );
                state.pointer_world = world;
                state.pointer_probe.position = world;
                self.bridge.request_once(
                    Request::CheckCollision {
                        probe: state.pointer_probe.clone(),
                    },
                    |state: &mut EngineState, response| {
                        if let Response::Overlap { entity } = response {
                            state.set_hovered(*entity);
                        }
                    },
                );
            }
            InputEvent::PointerButton {
                button: MouseButton::Left,
                pressed: true,
                shift,
            } => {
                let state = &mut self.state;
                let hovered = state.over.map(|id| {
                    let selectable = state.scene.get(id).is_some_and(|o| o.selectable);
                    (id, selectable)
                });
                state.selection.press(hovered, *shift);
            }
            _ => {}
        }
    }

    /// Whether a key (or mirrored mouse button) is held.
    pub fn key(&self, code: &str) -> bool {
        self.state.input.key(code)
    }

    /// Validate and apply a runtime setting.
    ///
    /// Rejected values are logged and leave every piece of state untouched.
    pub fn apply_setting(&mut self, setting: Setting, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let value = value.into();
        if let Err(err) = self.state.config.apply(setting, &value) {
            tracing::error!(error = %err, "setting rejected");
            return Err(err);
        }
        let config = &self.state.config;
        let clock = self.cadence.clock_mut();
        match setting {
            Setting::MaxRate => clock.max_rate = config.max_rate,
            Setting::Speed => clock.speed = config.speed,
            Setting::CatchUp => clock.catch_up = config.catch_up,
            Setting::Gravity => self.bridge.send(Request::SetGravity {
                value: config.gravity,
            }),
            Setting::Zoom | Setting::Debug | Setting::Background | Setting::TextColor => {}
        }
        if matches!(setting, Setting::MaxRate) {
            self.frame_costs.set_budget(self.cadence.tick_interval());
        }
        tracing::debug!(%setting, %value, "setting applied");
        Ok(())
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), ConfigError> {
        self.apply_setting(Setting::Zoom, zoom)
    }

    pub fn set_max_rate(&mut self, rate: f64) -> Result<(), ConfigError> {
        self.apply_setting(Setting::MaxRate, rate)
    }

    pub fn set_debug(&mut self, on: bool) -> Result<(), ConfigError> {
        self.apply_setting(Setting::Debug, on)
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), ConfigError> {
        self.apply_setting(Setting::Speed, speed)
    }

    pub fn set_gravity(&mut self, gravity: f64) -> Result<(), ConfigError> {
        self.apply_setting(Setting::Gravity, gravity)
    }

    pub fn set_catch_up(&mut self, on: bool) -> Result<(), ConfigError> {
        self.apply_setting(Setting::CatchUp, on)
    }

    pub fn set_background(&mut self, color: &str) -> Result<(), ConfigError> {
        self.apply_setting(Setting::Background, color)
    }

    pub fn set_text_color(&mut self, color: &str) -> Result<(), ConfigError> {
        self.apply_setting(Setting::TextColor, color)
    }

    /// Register an object at `layer`. Objects added after start are not sent to the worker.
    pub fn add_object(&mut self, object: SceneObject, layer: i32) -> Result<ObjectKey, SceneError> {
        self.state.scene.add(object, layer).inspect_err(|err| {
            tracing::error!(error = %err, "object rejected");
        })
    }

    pub fn add_probe(&mut self, probe: DebugProbe) {
        tracing::debug!(name = %probe.name, target = %probe.target.short(), "probe registered");
        self.state.debug.probes.push(probe);
    }

    pub fn write_console(&mut self, text: impl Into<String>, level: ConsoleLevel) {
        self.state.debug.console.push(text, level);
    }

    /// Queue a worker request without a continuation.
    pub fn send(&mut self, request: Request) {
        self.bridge.send(request);
    }

    pub(crate) fn apply_commands(&mut self, commands: Commands) {
        for command in commands {
            match command {
                Command::AddObject { object, layer } => {
                    let _ = self.add_object(object, layer);
                }
                Command::SetPosition { entity, position } => {
                    match self.state.scene.get_mut(entity) {
                        Some(object) => object.position = position,
                        None => tracing::debug!(entity = %entity.short(), "position for unknown object ignored"),
                    }
                }
                Command::ApplySetting { setting, value } => {
                    let _ = self.apply_setting(setting, value);
                }
                Command::Send {
                    request,
                    continuation,
                    one_shot,
                } => self.bridge.enqueue(request, continuation, one_shot),
                Command::AddProbe(probe) => self.add_probe(probe),
                Command::WriteConsole { text, level } => self.write_console(text, level),
            }
        }
    }

    pub(crate) fn flush_worker(&mut self, now_ms: f64) {
        let Some(port) = self.port.as_mut() else {
            return;
        };
        match self.bridge.flush(&mut **port, now_ms) {
            Ok(sent) => {
                if sent > 0 {
                    tracing::trace!(sent, "worker queue flushed");
                }
            }
            Err(err) => {
                if !self.worker_lost {
                    self.worker_lost = true;
                    tracing::error!(error = %err, "physics worker unreachable, dropping requests");
                }
            }
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    pub fn clock(&self) -> &FrameClock {
        self.cadence.clock()
    }

    pub fn cadence(&self) -> &CadenceController {
        &self.cadence
    }

    pub fn phase(&self) -> Phase {
        self.cadence.phase()
    }

    pub fn is_running(&self) -> bool {
        self.cadence.phase() != Phase::Stopped
    }

    /// Interval the host's tick source should fire at.
    pub fn tick_interval(&self) -> std::time::Duration {
        self.cadence.tick_interval()
    }

    /// Frame-body costs against the current tick budget.
    pub fn frame_costs(&self) -> &FrameCosts {
        &self.frame_costs
    }

    /// Frame bodies executed since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Correlation entries awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.bridge.pending_len()
    }

    /// Requests waiting for the next flush.
    pub fn queued_requests(&self) -> usize {
        self.bridge.queued_len()
    }
}
