//! Frame-body cost accounting against the tick budget.
//!
//! A body that outlives one tick interval keeps the gate closed when the next
//! tick arrives, which the cadence counts as a lost frame. Tracking which
//! bodies ran over budget separates slow user code from scheduler jitter.

use std::collections::VecDeque;
use std::time::Duration;

/// Frames kept for the rolling window.
pub const DEFAULT_WINDOW: usize = 120;

#[derive(Debug, Clone)]
pub struct FrameCosts {
    recent: VecDeque<Duration>,
    window: usize,
    budget: Duration,
    measured: u64,
    over_budget: u64,
    streak: u32,
}

impl FrameCosts {
    pub fn new(window: usize, budget: Duration) -> Self {
        let window = window.max(1);
        Self {
            recent: VecDeque::with_capacity(window),
            window,
            budget,
            measured: 0,
            over_budget: 0,
            streak: 0,
        }
    }

    /// Time one body may take before the next tick finds the gate closed.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn set_budget(&mut self, budget: Duration) {
        self.budget = budget;
    }

    /// Record one body's cost. Returns whether it ran over budget.
    pub fn record(&mut self, cost: Duration) -> bool {
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(cost);
        self.measured += 1;

        let over = cost > self.budget;
        if over {
            self.over_budget += 1;
            self.streak += 1;
            tracing::debug!(
                cost_ms = cost.as_secs_f64() * 1000.0,
                budget_ms = self.budget.as_secs_f64() * 1000.0,
                streak = self.streak,
                "frame body over budget"
            );
        } else {
            self.streak = 0;
        }
        over
    }

    /// Bodies measured since construction.
    pub fn measured(&self) -> u64 {
        self.measured
    }

    /// Bodies that ran over budget since construction.
    pub fn over_budget(&self) -> u64 {
        self.over_budget
    }

    /// Consecutive over-budget bodies ending with the latest one.
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Over-budget bodies within the rolling window.
    pub fn recent_over_budget(&self) -> usize {
        self.recent.iter().filter(|&&c| c > self.budget).count()
    }

    pub fn mean(&self) -> Duration {
        if self.recent.is_empty() {
            return Duration::ZERO;
        }
        self.recent.iter().sum::<Duration>() / self.recent.len() as u32
    }

    pub fn worst(&self) -> Duration {
        self.recent.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    /// Share of the budget the mean body leaves unused. Negative when the
    /// mean body is already too slow.
    pub fn headroom(&self) -> f64 {
        let budget = self.budget.as_secs_f64();
        if budget == 0.0 {
            return 0.0;
        }
        1.0 - self.mean().as_secs_f64() / budget
    }
}
