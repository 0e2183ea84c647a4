use crate::config::EngineConfig;

/// What the last [`FrameClock::advance`] did to the simulated timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timeline {
    /// Tick ran at or above the floor rate with no banked lag to repay.
    OnTime,
    /// Tick ran below the floor rate; `delta_time` was clamped and the raw
    /// delta banked.
    Underrun { banked: f64 },
    /// Part of the banked lag was repaid this tick.
    CatchingUp { repaid: f64, remaining: f64 },
    /// All remaining banked lag was repaid this tick.
    CaughtUp { repaid: f64 },
}

/// Simulation clock.
///
/// Times in milliseconds are wall-clock; `delta_time` and `behind_time` are
/// simulated seconds. The clock is created once and mutated every successful
/// tick; recreating the tick source never resets it.
#[derive(Debug, Clone)]
pub struct FrameClock {
    pub max_rate: f64,
    pub min_rate: f64,
    pub speed: f64,
    pub catch_up: bool,
    pub catch_up_budget: f64,
    pub clear_interval_ms: f64,
    pub restart_delay_ms: f64,

    delta_time: f64,
    fps: f64,
    fps_sum: f64,
    fps_count: u64,
    elapsed_ms: f64,
    elapsed_since_clear_ms: f64,
    behind_time: f64,
    loss_count: u64,
    last_ms: f64,
}

impl FrameClock {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_rate: config.max_rate,
            min_rate: config.min_rate,
            speed: config.speed,
            catch_up: config.catch_up,
            catch_up_budget: config.catch_up_budget,
            clear_interval_ms: config.clear_interval_ms,
            restart_delay_ms: config.restart_delay_ms,
            delta_time: 0.0,
            fps: 0.0,
            fps_sum: 0.0,
            fps_count: 0,
            elapsed_ms: 0.0,
            elapsed_since_clear_ms: 0.0,
            behind_time: 0.0,
            loss_count: 0,
            last_ms: 0.0,
        }
    }

    /// Milliseconds between scheduled ticks.
    pub fn tick_budget_ms(&self) -> f64 {
        1000.0 / self.max_rate
    }

    /// Sets the wall-clock reference the next tick measures from.
    pub fn set_baseline(&mut self, now_ms: f64) {
        self.last_ms = now_ms;
    }

    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Mean FPS over every measured tick.
    pub fn average_fps(&self) -> f64 {
        if self.fps_count == 0 {
            0.0
        } else {
            self.fps_sum / self.fps_count as f64
        }
    }

    /// Total wall-clock time measured by successful ticks.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn elapsed_since_clear_ms(&self) -> f64 {
        self.elapsed_since_clear_ms
    }

    pub fn behind_time(&self) -> f64 {
        self.behind_time
    }

    pub fn loss_count(&self) -> u64 {
        self.loss_count
    }

    pub(crate) fn record_loss(&mut self) {
        self.loss_count += 1;
    }

    /// Whether the tick source is due for teardown.
    pub fn watchdog_due(&self) -> bool {
        self.elapsed_since_clear_ms >= self.clear_interval_ms
    }

    pub(crate) fn clear_watchdog(&mut self) {
        self.elapsed_since_clear_ms = 0.0;
    }

    /// Measure the time since the previous successful tick and derive this
    /// tick's simulated delta, applying the underrun and catch-up policies.
    pub fn advance(&mut self, now_ms: f64) -> Timeline {
        let t = (now_ms - self.last_ms).max(0.0);
        self.last_ms = now_ms;
        self.elapsed_ms += t;
        self.elapsed_since_clear_ms += t;
        self.delta_time = (t / 1000.0) * self.speed;

        if self.delta_time > 0.0 {
            self.fps = 1.0 / (self.delta_time / self.speed);
            self.fps_sum += self.fps;
            self.fps_count += 1;
        }

        if self.delta_time > 0.0 && self.fps < self.min_rate {
            let banked = self.delta_time;
            self.behind_time += banked;
            self.delta_time = 1.0 / self.min_rate;
            if self.catch_up {
                tracing::warn!(
                    fps = self.fps,
                    behind = self.behind_time,
                    budget = self.catch_up_budget,
                    "running behind the main timeline, catching up"
                );
            }
            return Timeline::Underrun { banked };
        }

        if self.behind_time > 0.0 && self.catch_up {
            if self.behind_time < self.catch_up_budget {
                let repaid = self.behind_time * self.speed;
                self.delta_time += repaid;
                self.behind_time = 0.0;
                tracing::info!(repaid, "main timeline reached");
                return Timeline::CaughtUp { repaid };
            }
            // Speed above 1 can overshoot the remaining debt.
            let repaid = (self.catch_up_budget * self.speed).min(self.behind_time);
            self.delta_time += repaid;
            self.behind_time -= repaid;
            return Timeline::CatchingUp {
                repaid,
                remaining: self.behind_time,
            };
        }

        Timeline::OnTime
    }
}
