use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NO_PRESENT: u64 = u64::MAX;

/// Resettable elapsed-time clock shared by a canvas and its worker.
///
/// `elapsed = now - epoch - offset`; resetting moves the offset, never the epoch, so reads
/// stay lock-free.
#[derive(Debug)]
pub struct PresentationClock {
    epoch: Instant,
    offset_nanos: AtomicI64,
    last_present_nanos: AtomicU64,
}

impl Default for PresentationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationClock {
    /// Clock reading zero now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            offset_nanos: AtomicI64::new(0),
            last_present_nanos: AtomicU64::new(NO_PRESENT),
        }
    }

    fn since_epoch_nanos(&self) -> i64 {
        i64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }

    /// Time on the clock now (never negative).
    pub fn elapsed(&self) -> Duration {
        let nanos = self.since_epoch_nanos() - self.offset_nanos.load(Ordering::Acquire);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(0))
    }

    /// Make the clock read `elapsed` now.
    pub fn reset(&self, elapsed: Duration) {
        let wanted = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        self.offset_nanos
            .store(self.since_epoch_nanos() - wanted, Ordering::Release);
    }

    /// Record a present happening now and return its timestamp.
    pub fn mark_present(&self) -> Duration {
        let at = self.elapsed();
        let nanos = u64::try_from(at.as_nanos()).unwrap_or(NO_PRESENT - 1);
        self.last_present_nanos.store(nanos, Ordering::Release);
        at
    }

    /// Timestamp of the latest present, `None` before the first one.
    pub fn last_present(&self) -> Option<Duration> {
        match self.last_present_nanos.load(Ordering::Acquire) {
            NO_PRESENT => None,
            nanos => Some(Duration::from_nanos(nanos)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/clock.rs"]
mod tests;
