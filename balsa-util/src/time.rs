use std::time::Duration;

use nix::sys::time::TimeValLike;
use nix::time::{clock_gettime, ClockId};

/// Microseconds since an unspecified epoch, monotonic within one process run.
/// Used for pacing (rate synchronizer) and for delay bookkeeping, never
/// persisted or compared across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(u64);

impl Instant {
    pub fn now() -> Self {
        let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .expect("clock_gettime(CLOCK_MONOTONIC)");

        Instant(ts.num_microseconds() as u64)
    }

    pub fn checked_duration_since(&self, earlier: Instant) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_micros)
    }

    pub fn add_micros(&self, micros: u64) -> Instant {
        Instant(self.0.saturating_add(micros))
    }
}

pub fn sleep(dur: Duration) {
    std::thread::sleep(dur);
}
