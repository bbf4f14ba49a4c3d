use std::time::{Duration, Instant};

/// Default idle time after which the trace starts a new line.
pub const DEFAULT_IDLE_GAP: Duration = Duration::from_secs(2);

/// Per-worker record of when it last captured bytes.
#[derive(Debug, Clone)]
pub struct IdleTracker {
    threshold: Duration,
    last_capture: Instant,
}

impl IdleTracker {
    /// `started` counts as the last capture, so a first chunk arriving more
    /// than `threshold` after startup also starts a new line.
    pub fn new(threshold: Duration, started: Instant) -> Self {
        Self {
            threshold,
            last_capture: started,
        }
    }

    /// Note a capture at `now`. Returns whether the gap since the previous
    /// capture exceeded the threshold.
    pub fn observe(&mut self, now: Instant) -> bool {
        let gap = now.saturating_duration_since(self.last_capture);
        self.last_capture = now;
        gap > self.threshold
    }
}
