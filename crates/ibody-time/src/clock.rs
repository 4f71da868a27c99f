//! Clock implementations

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use ibody_core::PerformanceTime;

/// Monotonic performance clock, read on demand
pub trait Clock {
    fn now(&self) -> PerformanceTime;
}

/// Wall clock for record timestamps (milliseconds since the Unix epoch)
pub trait WallClock {
    fn unix_millis(&self) -> u64;
}

/// Monotonic clock backed by the OS, zero at construction
/// INVARIANT: readings never decrease
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    reference: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            reference: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> PerformanceTime {
        let elapsed = self.reference.elapsed().as_millis();
        PerformanceTime::from_millis(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// Wall clock backed by `SystemTime`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Manually driven clock for simulation and tests.
///
/// Clones share the same reading. Serves as both a performance clock and a
/// wall clock (offset by `wall_epoch`).
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
    wall_epoch: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manual clock whose wall reading starts at `wall_epoch` ms
    pub fn with_wall_epoch(wall_epoch: u64) -> Self {
        ManualClock {
            millis: Arc::new(AtomicU64::new(0)),
            wall_epoch,
        }
    }

    /// Move the clock forward
    pub fn advance(&self, dt: Duration) -> PerformanceTime {
        let millis = u64::try_from(dt.as_millis()).unwrap_or(u64::MAX);
        let prev = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(millis)))
            .unwrap_or_else(|t| t);
        PerformanceTime::from_millis(prev.saturating_add(millis))
    }

    /// Jump to an absolute reading. Only moves forward.
    pub fn set(&self, t: PerformanceTime) {
        self.millis.fetch_max(t.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> PerformanceTime {
        PerformanceTime::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

impl WallClock for ManualClock {
    fn unix_millis(&self) -> u64 {
        self.wall_epoch
            .saturating_add(self.millis.load(Ordering::SeqCst))
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> PerformanceTime {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> PerformanceTime {
        (**self).now()
    }
}
