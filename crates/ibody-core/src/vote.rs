//! Votes and label statistics
//!
//! A vote is one viewer's free-text label for the action currently being
//! trained, with a self-rated confidence in 0..=100. Votes are append-only.
//! Label statistics are derived from the full vote set and never stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Phase, ViewerId};

/// Storage key prefix for an action's vote collection
pub const ACTION_KEY_PREFIX: &str = "action_";

/// Lowest accepted confidence
pub const MIN_CONFIDENCE: f64 = 0.0;

/// Highest accepted confidence
pub const MAX_CONFIDENCE: f64 = 100.0;

/// Storage key of an action's vote collection (`action_<n>`)
pub fn action_key(action: u32) -> String {
    format!("{ACTION_KEY_PREFIX}{action}")
}

/// Parse an `action_<n>` storage key; anything else yields `None`
pub fn parse_action_key(key: &str) -> Option<u32> {
    let digits = key.strip_prefix(ACTION_KEY_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A stored vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub viewer_id: ViewerId,
    /// Phase observed by the viewer when submitting
    pub phase: Phase,
    pub action: u32,
    /// Trimmed, non-empty label text
    pub label: String,
    pub confidence: f64,
    /// Milliseconds since the Unix epoch, viewer clock
    pub created_at: u64,
}

/// Aggregate for one distinct label within one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelStat {
    pub label: String,
    /// Mean confidence across votes sharing this exact label
    pub avg: f64,
    pub count: u32,
}

/// Ranked labels per action, each list sorted by descending average.
///
/// An action with no valid labels has no entry at all: a missing action
/// means "no data", which is distinct from a label with zero confidence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionLabelStats {
    actions: BTreeMap<u32, Vec<LabelStat>>,
}

impl ActionLabelStats {
    pub fn new() -> Self {
        ActionLabelStats::default()
    }

    /// Record the ranking of an action. Empty rankings are not stored.
    pub fn insert(&mut self, action: u32, ranked: Vec<LabelStat>) {
        if ranked.is_empty() {
            self.actions.remove(&action);
        } else {
            self.actions.insert(action, ranked);
        }
    }

    /// Ranked labels for an action, `None` when there is no data
    pub fn get(&self, action: u32) -> Option<&[LabelStat]> {
        self.actions.get(&action).map(Vec::as_slice)
    }

    /// Highest-ranked label of an action
    pub fn top(&self, action: u32) -> Option<&LabelStat> {
        self.get(action).and_then(|ranked| ranked.first())
    }

    /// Top label text per action
    pub fn top_labels(&self) -> BTreeMap<u32, &str> {
        self.actions
            .iter()
            .filter_map(|(action, ranked)| ranked.first().map(|s| (*action, s.label.as_str())))
            .collect()
    }

    pub fn contains(&self, action: u32) -> bool {
        self.actions.contains_key(&action)
    }

    /// Actions with data, ascending
    pub fn actions(&self) -> impl Iterator<Item = u32> + '_ {
        self.actions.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &[LabelStat])> {
        self.actions.iter().map(|(a, r)| (*a, r.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Total number of votes counted across all actions
    pub fn total_votes(&self) -> u32 {
        self.actions
            .values()
            .flat_map(|ranked| ranked.iter().map(|s| s.count))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(label: &str, avg: f64, count: u32) -> LabelStat {
        LabelStat {
            label: label.to_string(),
            avg,
            count,
        }
    }

    #[test]
    fn test_action_key_parsing() {
        assert_eq!(action_key(3), "action_3");
        assert_eq!(parse_action_key("action_3"), Some(3));
        assert_eq!(parse_action_key("action_12"), Some(12));
        assert_eq!(parse_action_key("action_"), None);
        assert_eq!(parse_action_key("action_-1"), None);
        assert_eq!(parse_action_key("action_2x"), None);
        assert_eq!(parse_action_key("Action_2"), None);
        assert_eq!(parse_action_key("action_99999999999"), None);
    }

    #[test]
    fn test_empty_ranking_is_not_stored() {
        let mut stats = ActionLabelStats::new();
        stats.insert(1, vec![stat("wave", 50.0, 1)]);
        stats.insert(2, Vec::new());

        assert!(stats.contains(1));
        assert!(!stats.contains(2));
        assert!(stats.get(2).is_none());
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_top_labels() {
        let mut stats = ActionLabelStats::new();
        stats.insert(2, vec![stat("clap", 90.0, 1), stat("wave", 70.0, 2)]);
        stats.insert(4, vec![stat("spin", 10.0, 5)]);

        let top = stats.top_labels();
        assert_eq!(top.get(&2), Some(&"clap"));
        assert_eq!(top.get(&4), Some(&"spin"));
        assert_eq!(stats.top(2).map(|s| s.count), Some(1));
        assert_eq!(stats.total_votes(), 8);
    }

    #[test]
    fn test_vote_wire_shape() {
        let vote = Vote {
            viewer_id: ViewerId::new("viewer-abc"),
            phase: Phase::Training,
            action: 1,
            label: "wave".into(),
            confidence: 80.0,
            created_at: 1_700_000_000_000,
        };
        let value = serde_json::to_value(&vote).unwrap();
        assert_eq!(value["viewerId"], "viewer-abc");
        assert_eq!(value["phase"], "training");
        assert_eq!(value["createdAt"], 1_700_000_000_000u64);
    }
}
