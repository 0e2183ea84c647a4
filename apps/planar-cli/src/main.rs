use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use planar_common::{Collider, EntityId, Vec2};
use planar_input::InputEvent;
use planar_kernel::{
    Commands, ConsoleLevel, DebugProbe, EngineConfig, FrameState, Host, RunSummary, SceneObject,
    Setting, Simulation, Surface,
};
use planar_physics::PhysicsWorker;
use planar_render::DebugTextRenderer;
use planar_tools::EngineInspector;
use tracing_subscriber::EnvFilter;

/// Wall-clock length of one host run between pointer sweeps.
const SEGMENT: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "planar-cli", about = "Headless driver for the planar engine")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print engine version and crate info
    Info,
    /// Run a headless simulation against the physics worker
    Run(RunArgs),
    /// Print the effective configuration as JSON
    Config {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Wall-clock seconds to run for
    #[arg(short, long, default_value = "3")]
    seconds: f64,
    /// Number of falling bodies
    #[arg(short, long, default_value = "8")]
    bodies: usize,
    /// Target tick rate
    #[arg(long)]
    max_rate: Option<f64>,
    /// Simulation speed multiplier
    #[arg(long)]
    speed: Option<f64>,
    /// Repay lag after slow frames
    #[arg(long)]
    catch_up: bool,
    /// Gravity constant sent to the worker
    #[arg(long)]
    gravity: Option<f64>,
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the last rendered frame
    #[arg(long)]
    show_frame: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Falling bodies over a static floor.
struct Rain {
    count: usize,
    announced: u64,
}

impl Simulation for Rain {
    fn start(&mut self, frame: &FrameState<'_>, commands: &mut Commands) -> anyhow::Result<()> {
        let width = frame.screen_size.x / frame.zoom as f32;
        let floor = SceneObject::new("floor", Vec2::new(width / 2.0, 5.0))
            .with_collider(Collider::Box {
                half_extents: Vec2::new(width / 2.0, 5.0),
            })
            .with_color("gray");
        commands.add_object(floor, -1);

        let mut first: Option<EntityId> = None;
        for i in 0..self.count {
            let x = width * (i as f32 + 0.5) / self.count.max(1) as f32;
            let y = 200.0 + 40.0 * (i % 3) as f32;
            let ball = SceneObject::new(format!("ball-{i}"), Vec2::new(x, y))
                .with_collider(Collider::Circle { radius: 8.0 })
                .with_color("tomato")
                .dynamic()
                .selectable();
            let entity = commands.add_object(ball, 0);
            first.get_or_insert(entity);
        }
        if let Some(entity) = first {
            commands.add_probe(DebugProbe::new("ball-0.position", entity, ["position"]));
        }
        commands.write_console(format!("{} bodies spawned", self.count), ConsoleLevel::Info);
        Ok(())
    }

    fn update(&mut self, frame: &FrameState<'_>, commands: &mut Commands) -> anyhow::Result<()> {
        let second = frame.total_time.floor() as u64;
        if second > self.announced {
            self.announced = second;
            commands.write_console(format!("t={second}s fps={:.1}", frame.fps), ConsoleLevel::Info);
        }
        Ok(())
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(rate) = args.max_rate {
        config.apply(Setting::MaxRate, &rate.into())?;
    }
    if let Some(speed) = args.speed {
        config.apply(Setting::Speed, &speed.into())?;
    }
    if let Some(gravity) = args.gravity {
        config.apply(Setting::Gravity, &gravity.into())?;
    }
    if args.catch_up {
        config.apply(Setting::CatchUp, &true.into())?;
    }
    config.validate()?;

    let worker = PhysicsWorker::spawn(Duration::from_millis(8)).context("failed to spawn physics worker")?;
    let renderer = DebugTextRenderer::new().log_every(60);
    let output = renderer.output();
    let surface = Surface::new(800.0, 600.0);

    let mut host = Host::start(
        config,
        surface,
        Rain {
            count: args.bodies,
            announced: 0,
        },
        renderer,
        worker.requests.clone(),
        worker.responses.clone(),
    )?;

    let total = Duration::from_secs_f64(args.seconds.max(0.0));
    let mut elapsed = Duration::ZERO;
    let mut totals = RunSummary::default();
    let mut sweep = 0.0_f32;
    while elapsed < total {
        let segment = SEGMENT.min(total - elapsed);
        let summary = host.run_for(segment);
        totals.ticks += summary.ticks;
        totals.frames += summary.frames;
        totals.overruns += summary.overruns;
        totals.restarts += summary.restarts;
        totals.responses += summary.responses;
        elapsed += segment;

        // Sweep the pointer along the row the balls start on.
        sweep = (sweep + 97.0) % surface.width;
        host.engine_mut().handle_input(&InputEvent::PointerMoved {
            x: sweep,
            y: surface.height - 200.0,
        });
    }

    let summary = EngineInspector::summary(host.engine());
    let hovered = host
        .engine()
        .state()
        .over()
        .and_then(|id| EngineInspector::inspect_object(host.engine(), id));
    host.shutdown();
    if worker.join().is_err() {
        tracing::warn!("physics worker panicked");
    }

    println!(
        "Ran {:.2}s: ticks={} frames={} overruns={} restarts={} worker responses={}",
        args.seconds, totals.ticks, totals.frames, totals.overruns, totals.restarts, totals.responses
    );
    println!("{summary}");
    match hovered {
        Some(info) => println!("Under pointer: {info}"),
        None => println!("Under pointer: nothing"),
    }
    if args.show_frame {
        println!("{}", output.latest());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Command::Info => {
            println!("planar-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", planar_common::crate_info());
            println!("input: {}", planar_input::crate_info());
            println!("kernel: {}", planar_kernel::crate_info());
            println!("physics: {}", planar_physics::crate_info());
            println!("render: {}", planar_render::crate_info());
            println!("tools: {}", planar_tools::crate_info());
        }
        Command::Run(args) => run(args)?,
        Command::Config { config } => {
            let config = load_config(config.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
