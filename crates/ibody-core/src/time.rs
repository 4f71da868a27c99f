//! Time primitives
//!
//! The performance runs on a single monotonic timeline measured in
//! milliseconds since an arbitrary epoch (the performer display's start-up).
//! Every derived duration saturates at zero.

use std::ops::Sub;
use std::time::Duration;

/// Performance time - monotonic milliseconds since an arbitrary epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PerformanceTime(pub u64);

impl PerformanceTime {
    pub const ZERO: PerformanceTime = PerformanceTime(0);

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        PerformanceTime(millis)
    }

    #[inline]
    pub fn from_secs(secs: u64) -> Self {
        PerformanceTime(secs.saturating_mul(1000))
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` lies in the future
    #[inline]
    pub fn saturating_since(self, earlier: PerformanceTime) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        PerformanceTime(self.0.saturating_add(millis))
    }
}

impl Sub<PerformanceTime> for PerformanceTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: PerformanceTime) -> Self::Output {
        self.saturating_since(rhs)
    }
}

impl std::fmt::Debug for PerformanceTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({}ms)", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_clamps_at_zero() {
        let early = PerformanceTime::from_millis(1_000);
        let late = PerformanceTime::from_millis(4_500);

        assert_eq!(late - early, Duration::from_millis(3_500));
        assert_eq!(early - late, Duration::ZERO);
    }

    #[test]
    fn test_saturating_add() {
        let t = PerformanceTime::from_secs(2).saturating_add(Duration::from_millis(250));
        assert_eq!(t.as_millis(), 2_250);
        assert_eq!(
            PerformanceTime(u64::MAX).saturating_add(Duration::from_secs(1)),
            PerformanceTime(u64::MAX)
        );
    }
}
