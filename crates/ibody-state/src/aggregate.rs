//! Vote aggregation
//!
//! Recomputed from scratch on every snapshot. The pipeline is total: a
//! malformed record is skipped (or its confidence read as 0), never an
//! error.
//!
//! Stage 1: action keys (`action_<n>`), anything else skipped
//! Stage 2: labels, trimmed; empty labels skipped entirely
//! Stage 3: confidences, unparseable values read as 0
//! Stage 4: per-label mean, stable sort by descending mean
//!
//! Records are visited in key order. Push keys are time-ordered, so ties in
//! the ranking keep submission order and a replayed snapshot always ranks
//! the same way.

use std::cmp::Ordering;
use std::collections::HashMap;

use ibody_core::{parse_action_key, ActionLabelStats, LabelStat};
use serde_json::Value;

/// What one aggregation pass saw
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregationReport {
    /// Actions with at least one valid label
    pub actions: u32,
    /// Votes counted
    pub counted: u32,
    /// Keys that were not `action_<n>` or held no collection
    pub skipped_keys: u32,
    /// Votes without a usable label
    pub skipped_votes: u32,
}

/// Vote aggregator owned by the performer display
#[derive(Debug, Default)]
pub struct VoteAggregator {
    stats: ActionLabelStats,
    report: AggregationReport,
}

impl VoteAggregator {
    pub fn new() -> Self {
        VoteAggregator::default()
    }

    /// Replace the statistics with those of a fresh `votes` snapshot
    /// (`None` when the session has no votes yet)
    pub fn ingest(&mut self, votes: Option<&Value>) -> &ActionLabelStats {
        let (stats, report) = match votes {
            Some(snapshot) => aggregate_votes(snapshot),
            None => Default::default(),
        };

        tracing::debug!(
            actions = report.actions,
            counted = report.counted,
            skipped_keys = report.skipped_keys,
            skipped_votes = report.skipped_votes,
            "recomputed label statistics"
        );

        self.stats = stats;
        self.report = report;
        &self.stats
    }

    pub fn stats(&self) -> &ActionLabelStats {
        &self.stats
    }

    pub fn report(&self) -> &AggregationReport {
        &self.report
    }
}

/// Aggregate a `sessions/{id}/votes` snapshot
pub fn aggregate_votes(snapshot: &Value) -> (ActionLabelStats, AggregationReport) {
    let mut stats = ActionLabelStats::new();
    let mut report = AggregationReport::default();

    let Some(by_action) = snapshot.as_object() else {
        return (stats, report);
    };

    for (key, collection) in by_action {
        let Some(action) = parse_action_key(key) else {
            report.skipped_keys += 1;
            continue;
        };
        let Some(votes) = collection_values(collection) else {
            report.skipped_keys += 1;
            continue;
        };

        let mut valid = Vec::new();
        for vote in votes {
            match vote_label(vote) {
                Some(label) => valid.push((label, parse_confidence(vote.get("confidence")))),
                None => report.skipped_votes += 1,
            }
        }

        report.counted += valid.len() as u32;
        let ranked = rank_labels(valid);
        if !ranked.is_empty() {
            report.actions += 1;
            stats.insert(action, ranked);
        }
    }

    (stats, report)
}

/// Group `(label, confidence)` pairs by exact label and rank them by mean
/// confidence, descending. Ties keep first-encounter order.
pub fn rank_labels<L, I>(votes: I) -> Vec<LabelStat>
where
    L: AsRef<str>,
    I: IntoIterator<Item = (L, f64)>,
{
    // label -> (sum, count), in first-encounter order
    let mut groups: Vec<(String, f64, u32)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (label, confidence) in votes {
        let label = label.as_ref().trim();
        if label.is_empty() {
            continue;
        }
        match index.get(label) {
            Some(&i) => {
                groups[i].1 += confidence;
                groups[i].2 += 1;
            }
            None => {
                index.insert(label.to_string(), groups.len());
                groups.push((label.to_string(), confidence, 1));
            }
        }
    }

    let mut ranked: Vec<LabelStat> = groups
        .into_iter()
        .map(|(label, sum, count)| LabelStat {
            label,
            avg: sum / f64::from(count),
            count,
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.avg.partial_cmp(&a.avg).unwrap_or(Ordering::Equal));
    ranked
}

/// Read a stored confidence the lenient way: numbers as-is, numeric
/// strings parsed, booleans as 0/1, empty strings and null as 0, anything
/// else (or any non-finite result) as 0
pub fn parse_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().unwrap_or(0.0)
            }
        }
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Trimmed label of a stored vote; `None` for missing, falsy or blank labels
fn vote_label(vote: &Value) -> Option<String> {
    let label = match vote.get("label")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => return None,
    };
    (!label.is_empty()).then_some(label)
}

fn collection_values(collection: &Value) -> Option<Box<dyn Iterator<Item = &Value> + '_>> {
    match collection {
        Value::Object(map) => Some(Box::new(map.values())),
        Value::Array(items) => Some(Box::new(items.iter())),
        _ => None,
    }
}
