//! Segment schedule - maps elapsed phase time to the active action
//!
//! A timed phase is a run of `num_actions` equal segments. Segment `i`
//! (zero-based) shows action `i + 1`; once every segment has elapsed the
//! phase is finished.

use std::time::Duration;

/// Schedule configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Length of one action segment
    pub segment_duration: Duration,
    /// Number of action slots per timed phase
    pub num_actions: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            segment_duration: Duration::from_secs(30),
            num_actions: 4,
        }
    }
}

/// Where a timed phase currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentPosition {
    /// An action segment is running
    Active {
        /// Action index, 1-based
        action: u32,
        /// Time until the next segment boundary
        remaining: Duration,
    },
    /// All segments have elapsed
    Finished,
}

impl SegmentPosition {
    pub fn action(self) -> Option<u32> {
        match self {
            SegmentPosition::Active { action, .. } => Some(action),
            SegmentPosition::Finished => None,
        }
    }

    pub fn remaining(self) -> Duration {
        match self {
            SegmentPosition::Active { remaining, .. } => remaining,
            SegmentPosition::Finished => Duration::ZERO,
        }
    }
}

/// Segment schedule
#[derive(Clone, Debug, Default)]
pub struct SegmentSchedule {
    config: ScheduleConfig,
}

impl SegmentSchedule {
    pub fn new(config: ScheduleConfig) -> Self {
        SegmentSchedule { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn num_actions(&self) -> u32 {
        self.config.num_actions
    }

    /// Duration of a whole timed phase
    pub fn total_duration(&self) -> Duration {
        self.config.segment_duration * self.config.num_actions
    }

    /// Position within the phase after `elapsed`
    pub fn position(&self, elapsed: Duration) -> SegmentPosition {
        let segment_ms = self.config.segment_duration.as_millis();
        if segment_ms == 0 {
            return SegmentPosition::Finished;
        }

        let elapsed_ms = elapsed.as_millis();
        let index = elapsed_ms / segment_ms;
        if index >= u128::from(self.config.num_actions) {
            return SegmentPosition::Finished;
        }

        let into_segment = elapsed_ms - index * segment_ms;
        let remaining_ms = segment_ms.saturating_sub(into_segment);

        SegmentPosition::Active {
            // index < num_actions, so it fits
            action: index as u32 + 1,
            remaining: Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(u64::MAX)),
        }
    }

    /// Active action after `elapsed`, `None` once finished
    pub fn action_at(&self, elapsed: Duration) -> Option<u32> {
        self.position(elapsed).action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_segment_boundaries() {
        let schedule = SegmentSchedule::default();

        assert_eq!(schedule.action_at(ms(0)), Some(1));
        assert_eq!(schedule.action_at(ms(29_999)), Some(1));
        assert_eq!(schedule.action_at(ms(30_000)), Some(2));
        assert_eq!(schedule.action_at(ms(59_999)), Some(2));
        assert_eq!(schedule.action_at(ms(60_000)), Some(3));
        assert_eq!(schedule.action_at(ms(119_999)), Some(4));
        assert_eq!(schedule.position(ms(120_000)), SegmentPosition::Finished);
        assert_eq!(schedule.total_duration(), ms(120_000));
    }

    #[test]
    fn test_remaining_time() {
        let schedule = SegmentSchedule::default();

        assert_eq!(schedule.position(ms(0)).remaining(), ms(30_000));
        assert_eq!(schedule.position(ms(42_500)).remaining(), ms(17_500));
        assert_eq!(schedule.position(ms(500_000)).remaining(), Duration::ZERO);
    }

    #[test]
    fn test_degenerate_schedules_finish_immediately() {
        let zero_len = SegmentSchedule::new(ScheduleConfig {
            segment_duration: Duration::ZERO,
            num_actions: 4,
        });
        assert_eq!(zero_len.position(ms(0)), SegmentPosition::Finished);

        let no_actions = SegmentSchedule::new(ScheduleConfig {
            segment_duration: ms(1_000),
            num_actions: 0,
        });
        assert_eq!(no_actions.position(ms(0)), SegmentPosition::Finished);
    }

    proptest! {
        #[test]
        fn prop_action_is_segment_index_plus_one(elapsed in 0u64..120_000) {
            let schedule = SegmentSchedule::default();
            let position = schedule.position(ms(elapsed));

            prop_assert_eq!(position.action(), Some((elapsed / 30_000) as u32 + 1));
            prop_assert!(position.remaining() > Duration::ZERO);
            prop_assert!(position.remaining() <= ms(30_000));
        }

        #[test]
        fn prop_finished_after_all_segments(elapsed in 120_000u64..10_000_000) {
            let schedule = SegmentSchedule::default();
            prop_assert_eq!(schedule.position(ms(elapsed)), SegmentPosition::Finished);
        }
    }
}
