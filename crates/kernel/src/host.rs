//! Threaded host: drives an [`Engine`] from a crossbeam tick source and pumps
//! worker responses between ticks.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, after, at, never, select, tick};

use crate::cadence::{Phase, TickOutcome};
use crate::config::{ConfigError, EngineConfig};
use crate::engine::{Engine, InitError, Surface};
use crate::frame::{RenderPass, Simulation};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Init(#[from] InitError),
}

/// Counters for one [`Host::run_for`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub frames: u64,
    pub overruns: u64,
    pub restarts: u64,
    pub responses: u64,
}

pub struct Host {
    engine: Engine,
    inbound: Receiver<String>,
    worker_gone: bool,
    epoch: Instant,
    /// When the torn-down tick source comes back. Survives across runs.
    restart_at: Option<Instant>,
}

impl Host {
    /// Build and start an engine talking to a worker over the given channels.
    pub fn start<S, R>(
        config: EngineConfig,
        surface: Surface,
        simulation: S,
        renderer: R,
        outbound: Sender<String>,
        inbound: Receiver<String>,
    ) -> Result<Self, HostError>
    where
        S: Simulation + 'static,
        R: RenderPass + 'static,
    {
        let epoch = Instant::now();
        let mut engine = Engine::new(config)?;
        engine.start(surface, simulation, renderer, outbound, 0.0)?;
        Ok(Self {
            engine,
            inbound,
            worker_gone: false,
            epoch,
            restart_at: None,
        })
    }

    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Run the loop for `duration` of wall-clock time.
    pub fn run_for(&mut self, duration: Duration) -> RunSummary {
        let deadline = after(duration);
        if self.restart_at.is_none()
            && matches!(self.engine.phase(), Phase::Draining | Phase::Restarting)
        {
            // Ticked into a restart outside the loop.
            self.engine.timer_torn_down();
            self.restart_at = Some(Instant::now() + self.restart_delay());
        }
        let mut interval = self.engine.tick_interval();
        let (mut ticker, mut restart) = match self.restart_at {
            Some(when) => (never(), at(when)),
            None => (tick(interval), never()),
        };
        let mut inbound = if self.worker_gone {
            never()
        } else {
            self.inbound.clone()
        };
        let mut summary = RunSummary::default();

        loop {
            select! {
                recv(ticker) -> _ => {
                    summary.ticks += 1;
                    let now = self.now_ms();
                    match self.engine.tick(now) {
                        TickOutcome::Frame(_) => summary.frames += 1,
                        TickOutcome::Overrun { .. } => summary.overruns += 1,
                        TickOutcome::Restart { delay } => {
                            summary.restarts += 1;
                            ticker = never();
                            self.engine.timer_torn_down();
                            let when = Instant::now() + delay;
                            self.restart_at = Some(when);
                            restart = at(when);
                        }
                        TickOutcome::Skipped(_) => {}
                    }
                }
                recv(restart) -> _ => {
                    restart = never();
                    self.restart_at = None;
                    self.engine.rearm();
                    interval = self.engine.tick_interval();
                    ticker = tick(interval);
                }
                recv(inbound) -> message => match message {
                    Ok(text) => {
                        summary.responses += 1;
                        self.engine.on_worker_message(&text);
                    }
                    Err(_) => {
                        tracing::warn!("physics worker disconnected");
                        self.worker_gone = true;
                        inbound = never();
                    }
                },
                recv(deadline) -> _ => break,
            }

            let wanted = self.engine.tick_interval();
            if wanted != interval && self.engine.phase() == Phase::Running {
                tracing::debug!(?wanted, "tick rate changed, re-arming tick source");
                interval = wanted;
                ticker = tick(interval);
            }
        }

        tracing::debug!(?summary, "host run finished");
        summary
    }

    fn restart_delay(&self) -> Duration {
        Duration::from_secs_f64(self.engine.clock().restart_delay_ms.max(0.0) / 1000.0)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Tear the engine down and hand it back.
    pub fn shutdown(mut self) -> Engine {
        self.engine.teardown();
        self.engine
    }
}
