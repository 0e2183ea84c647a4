use std::time::Duration;

use planar_common::{Collider, EntityId, Vec2};
use planar_kernel::{
    Commands, EngineConfig, FrameState, Host, Phase, RenderPass, RenderStatus, RenderView, SceneObject,
    Simulation, Surface,
};
use planar_physics::PhysicsWorker;

struct Falling {
    ball: Option<SceneObject>,
}

impl Simulation for Falling {
    fn start(&mut self, _frame: &FrameState<'_>, commands: &mut Commands) -> anyhow::Result<()> {
        if let Some(ball) = self.ball.take() {
            commands.add_object(ball, 0);
        }
        Ok(())
    }

    fn update(&mut self, _frame: &FrameState<'_>, _commands: &mut Commands) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Blank;

impl RenderPass for Blank {
    fn render(&mut self, _view: &RenderView<'_>) -> RenderStatus {
        RenderStatus::Presented
    }
}

fn ball() -> (SceneObject, EntityId) {
    let ball = SceneObject::new("ball", Vec2::ZERO)
        .with_collider(Collider::Circle { radius: 0.5 })
        .dynamic();
    let entity = ball.entity;
    (ball, entity)
}

#[test]
fn worker_updates_flow_back_into_the_scene() {
    let worker = PhysicsWorker::spawn(Duration::from_millis(5)).unwrap();
    let (object, entity) = ball();
    let mut host = Host::start(
        EngineConfig::default(),
        Surface::new(640.0, 480.0),
        Falling { ball: Some(object) },
        Blank,
        worker.requests.clone(),
        worker.responses.clone(),
    )
    .unwrap();

    let summary = host.run_for(Duration::from_millis(300));
    assert!(summary.frames > 0);
    assert!(summary.responses > 0);

    let engine = host.engine();
    assert_eq!(engine.state().bodies().len(), 1);
    // Gravity pulls the ball down in world space.
    assert!(engine.state().scene().get(entity).unwrap().position.y < 0.0);
    assert_eq!(engine.pending_requests(), 1);

    let engine = host.shutdown();
    assert!(!engine.is_running());
    drop(engine);
    worker.join().unwrap();
}

#[test]
fn watchdog_restarts_the_tick_source_and_keeps_running() {
    let worker = PhysicsWorker::spawn(Duration::from_millis(10)).unwrap();
    let config = EngineConfig {
        clear_interval_ms: 100.0,
        restart_delay_ms: 10.0,
        ..EngineConfig::default()
    };
    let mut host = Host::start(
        config,
        Surface::default(),
        Falling { ball: None },
        Blank,
        worker.requests.clone(),
        worker.responses.clone(),
    )
    .unwrap();

    let summary = host.run_for(Duration::from_millis(500));
    assert!(summary.restarts >= 1);
    assert!(summary.frames > summary.restarts);
    assert_eq!(host.engine().clock().loss_count(), 0);
    host.shutdown();
    worker.join().unwrap();
}

#[test]
fn restart_pending_at_the_end_of_a_run_resumes_in_the_next() {
    let worker = PhysicsWorker::spawn(Duration::from_millis(10)).unwrap();
    let config = EngineConfig {
        clear_interval_ms: 100.0,
        restart_delay_ms: 250.0,
        ..EngineConfig::default()
    };
    let mut host = Host::start(
        config,
        Surface::default(),
        Falling { ball: None },
        Blank,
        worker.requests.clone(),
        worker.responses.clone(),
    )
    .unwrap();

    // The run ends while the tick source is still down.
    let first = host.run_for(Duration::from_millis(200));
    assert_eq!(first.restarts, 1);
    assert_eq!(host.engine().phase(), Phase::Restarting);

    // The tick source comes back and ticks run (and restart) again.
    let second = host.run_for(Duration::from_millis(600));
    assert!(second.restarts >= 1);
    assert!(second.ticks > 0);
    assert_eq!(host.engine().clock().loss_count(), 0);

    host.shutdown();
    worker.join().unwrap();
}
