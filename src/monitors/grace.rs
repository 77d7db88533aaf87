use std::time::Duration;

/// Tracks the grace period opened by the latest `BATTERY_LOW` event.
///
/// The trigger timestamp is only ever overwritten, never cleared. Whether the
/// pipeline is in grace is recomputed from it on every evaluation.
#[derive(Debug, Clone)]
pub struct GraceTracker {
    window_secs: f64,
    last_trigger: Option<f64>,
}

impl GraceTracker {
    pub fn new(window: Duration) -> GraceTracker {
        Self {
            window_secs: window.as_secs_f64(),
            last_trigger: None,
        }
    }

    /// Record a trigger at `ts` (seconds since the Unix epoch).
    pub fn record(&mut self, ts: f64) {
        self.last_trigger = Some(ts);
    }

    /// `(now - last_trigger) <= window`; never true before the first trigger.
    pub fn in_grace(&self, now: f64) -> bool {
        self.last_trigger
            .is_some_and(|last| now - last <= self.window_secs)
    }

    pub fn last_trigger(&self) -> Option<f64> {
        self.last_trigger
    }
}
