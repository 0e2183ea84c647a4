//! Tick cadence: the gate, the clock and the watchdog state machine.
//!
//! ```text
//! Stopped --start--> Running --watchdog--> Draining --teardown--> Restarting --rearm--> Running
//! ```
//!
//! Only `Running` executes frame bodies. Ticks delivered in any other phase are
//! skipped without touching the clock or the loss counter.

use std::time::Duration;

use crate::clock::{FrameClock, Timeline};
use crate::config::EngineConfig;
use crate::gate::TickGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Running,
    /// Watchdog fired; the host must tear the tick source down.
    Draining,
    /// Tick source torn down; waiting for the restart delay.
    Restarting,
}

/// What the caller should do with a scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Run the frame body, then call [`CadenceController::finish_frame`].
    Frame(Timeline),
    /// Previous body still in flight; this tick was dropped.
    Overrun { consecutive: u32 },
    /// Watchdog fired: tear the tick source down and re-arm after `delay`.
    Restart { delay: Duration },
    /// Not running.
    Skipped(Phase),
}

#[derive(Debug, Clone)]
pub struct CadenceController {
    clock: FrameClock,
    gate: TickGate,
    phase: Phase,
}

impl CadenceController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            clock: FrameClock::new(config),
            gate: TickGate::new(config.overrun_alert),
            phase: Phase::Stopped,
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn gate(&self) -> &TickGate {
        &self.gate
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Interval the tick source should fire at.
    pub fn tick_interval(&self) -> Duration {
        millis(self.clock.tick_budget_ms())
    }

    pub fn start(&mut self, now_ms: f64) {
        self.clock.set_baseline(now_ms);
        self.gate.open();
        self.phase = Phase::Running;
    }

    pub fn stop(&mut self) {
        self.phase = Phase::Stopped;
    }

    /// Handle one scheduled tick at wall-clock time `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Skipped(self.phase);
        }

        if !self.gate.is_open() {
            self.clock.record_loss();
            let overrun = self.gate.record_overrun();
            if overrun.alert {
                tracing::warn!(
                    fps = self.clock.fps(),
                    max_rate = self.clock.max_rate,
                    lost = self.clock.loss_count(),
                    "losing frames, consider a lower max rate or a cheaper update"
                );
            }
            return TickOutcome::Overrun {
                consecutive: overrun.consecutive,
            };
        }

        self.gate.close();
        let timeline = self.clock.advance(now_ms);

        if self.clock.watchdog_due() {
            self.clock.clear_watchdog();
            self.phase = Phase::Draining;
            tracing::debug!(
                delay_ms = self.clock.restart_delay_ms,
                "watchdog fired, restarting tick source"
            );
            return TickOutcome::Restart {
                delay: millis(self.clock.restart_delay_ms),
            };
        }

        TickOutcome::Frame(timeline)
    }

    /// Reopen the gate after a frame body completed.
    pub fn finish_frame(&mut self) {
        self.gate.open();
    }

    /// The host has discarded the tick source.
    pub fn timer_torn_down(&mut self) {
        if self.phase == Phase::Draining {
            self.phase = Phase::Restarting;
        }
    }

    /// A fresh tick source is armed. Forces the gate open.
    pub fn rearm(&mut self) {
        match self.phase {
            Phase::Draining | Phase::Restarting => {
                self.gate.open();
                self.phase = Phase::Running;
            }
            phase => tracing::debug!(?phase, "rearm ignored"),
        }
    }
}

/// Whole nanoseconds nearest to `ms` milliseconds.
fn millis(ms: f64) -> Duration {
    Duration::from_nanos((ms.max(0.0) * 1_000_000.0).round() as u64)
}
