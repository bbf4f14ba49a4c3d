//! Time sources for the relay.
//!
//! Workers measure idle gaps on a monotonic clock and stamp trace records with
//! wall-clock time. Both come from a `Clock` so tests can step time by hand.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Monotonic time, used for gap measurement.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for display only.
    fn wall(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Local>,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Local::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    fn wall(&self) -> DateTime<Local> {
        let elapsed = *self.elapsed.lock();
        // Out-of-range durations are not reachable in practice; fall back to the origin
        chrono::Duration::from_std(elapsed)
            .map(|d| self.wall_origin + d)
            .unwrap_or(self.wall_origin)
    }
}
