/// Result of a tick that found the gate closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overrun {
    /// Consecutive overruns since the last tick that ran.
    pub consecutive: u32,
    /// This overrun crossed the alert threshold for the first time.
    pub alert: bool,
}

/// "Previous tick finished" flag.
///
/// A tick body may only start while the gate is open. Closing it on entry and
/// reopening it when the body completes is what keeps tick bodies from
/// overlapping.
#[derive(Debug, Clone)]
pub struct TickGate {
    open: bool,
    overruns: u32,
    alert_threshold: u32,
    alerted: bool,
}

impl TickGate {
    /// A closed gate; it opens when the engine starts.
    pub fn new(alert_threshold: u32) -> Self {
        Self {
            open: false,
            overruns: 0,
            alert_threshold: alert_threshold.max(1),
            alerted: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted
    }

    pub fn consecutive_overruns(&self) -> u32 {
        self.overruns
    }

    /// Enter a tick body. Clears the overrun streak.
    pub(crate) fn close(&mut self) {
        self.open = false;
        self.overruns = 0;
        self.alerted = false;
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
    }

    pub(crate) fn record_overrun(&mut self) -> Overrun {
        self.overruns = self.overruns.saturating_add(1);
        let alert = !self.alerted && self.overruns >= self.alert_threshold;
        if alert {
            self.alerted = true;
        }
        Overrun {
            consecutive: self.overruns,
            alert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let gate = TickGate::new(3);
        assert!(!gate.is_open());
    }

    #[test]
    fn alert_fires_once_per_streak() {
        let mut gate = TickGate::new(3);
        assert!(!gate.record_overrun().alert);
        assert!(!gate.record_overrun().alert);
        let third = gate.record_overrun();
        assert!(third.alert);
        assert_eq!(third.consecutive, 3);
        assert!(!gate.record_overrun().alert);
        assert!(gate.is_alerted());
    }

    #[test]
    fn closing_resets_the_streak() {
        let mut gate = TickGate::new(2);
        gate.record_overrun();
        gate.record_overrun();
        assert!(gate.is_alerted());
        gate.open();
        gate.close();
        assert_eq!(gate.consecutive_overruns(), 0);
        assert!(!gate.is_alerted());
        gate.record_overrun();
        assert!(gate.record_overrun().alert);
    }
}
