//! Heads-up display model
//!
//! Text and emphasis only; fonts, boxes and placement belong to whatever
//! renders the frame.

use std::time::Duration;

use ibody_core::{ActionLabelStats, LabelStat, Phase, SessionState, NO_ACTION};

/// Most cards shown in the side list
pub const SIDE_LIST_LIMIT: usize = 11;

/// Status block in the top-left corner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hud {
    /// Session, phase and action lines
    pub status: Vec<String>,
    /// Phase-specific hint lines
    pub hints: Vec<String>,
    /// Audience labels, inference only
    pub overlay: Option<AudienceOverlay>,
}

/// Audience labels for the running inference action
#[derive(Debug, Clone, PartialEq)]
pub struct AudienceOverlay {
    pub action: u32,
    /// Top label line, or the no-data notice
    pub headline: String,
    pub has_labels: bool,
    /// Title of the side list, absent when there is nothing beyond the top label
    pub side_title: Option<String>,
    pub side: Vec<SideCard>,
}

/// One of the remaining labels
#[derive(Debug, Clone, PartialEq)]
pub struct SideCard {
    pub text: String,
    pub meta: String,
    /// Text brightness, 130..=255
    pub brightness: u8,
    /// Card background alpha, 70..=170
    pub alpha: u8,
}

/// Build the display model for one frame
pub fn build_hud(state: &SessionState, remaining: Option<Duration>, labels: &ActionLabelStats) -> Hud {
    Hud {
        status: status_lines(state),
        hints: hint_lines(state.phase, remaining),
        overlay: audience_overlay(state, labels),
    }
}

pub fn status_lines(state: &SessionState) -> Vec<String> {
    vec![
        format!("Session : {}", state.session_id),
        format!("Phase   : {}", state.phase),
        format!("Action  : {}", state.current_action),
    ]
}

pub fn hint_lines(phase: Phase, remaining: Option<Duration>) -> Vec<String> {
    let countdown = || {
        format!(
            "Next action switch in: {:.1}s",
            remaining.unwrap_or_default().as_secs_f64()
        )
    };

    match phase {
        Phase::Waiting => vec!["Press [S] to begin".to_string()],
        Phase::Training => vec!["Part 1 · training".to_string(), countdown()],
        Phase::Transition => vec![
            "Transition to part 2".to_string(),
            "Listening to the system message…".to_string(),
        ],
        Phase::Inference => vec!["Part 2 · inference".to_string(), countdown()],
        Phase::Done => vec!["Performance finished.".to_string()],
    }
}

/// Audience labels for the current inference action; `None` in any other
/// phase or when no action is running
pub fn audience_overlay(state: &SessionState, labels: &ActionLabelStats) -> Option<AudienceOverlay> {
    if state.phase != Phase::Inference || state.current_action == NO_ACTION {
        return None;
    }
    let action = state.current_action;
    let ranked = labels.get(action).unwrap_or_default();

    let Some((top, rest)) = ranked.split_first() else {
        return Some(AudienceOverlay {
            action,
            headline: format!("(no audience labels yet for action {action})"),
            has_labels: false,
            side_title: None,
            side: Vec::new(),
        });
    };

    let side: Vec<SideCard> = rest.iter().take(SIDE_LIST_LIMIT).map(side_card).collect();
    Some(AudienceOverlay {
        action,
        headline: format!(
            "“{}”     confidence {:.0}%    n={}",
            top.label, top.avg, top.count
        ),
        has_labels: true,
        side_title: (!side.is_empty())
            .then(|| format!("Other audience labels for action {action}:")),
        side,
    })
}

fn side_card(stat: &LabelStat) -> SideCard {
    let (brightness, alpha) = emphasis(stat.avg);
    SideCard {
        text: format!("“{}”", stat.label),
        meta: format!("confidence {:.0}%   n={}", stat.avg, stat.count),
        brightness,
        alpha,
    }
}

/// Map an average confidence 0..=100 linearly onto (brightness, alpha)
pub fn emphasis(avg: f64) -> (u8, u8) {
    let t = if avg.is_finite() { avg.clamp(0.0, 100.0) / 100.0 } else { 0.0 };
    let brightness = 130.0 + t * (255.0 - 130.0);
    let alpha = 70.0 + t * (170.0 - 70.0);
    (brightness.round() as u8, alpha.round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibody_core::SessionId;

    fn state(phase: Phase, action: u32) -> SessionState {
        SessionState {
            phase,
            current_action: action,
            session_id: SessionId::new("s1"),
        }
    }

    fn stat(label: &str, avg: f64, count: u32) -> LabelStat {
        LabelStat {
            label: label.to_string(),
            avg,
            count,
        }
    }

    #[test]
    fn test_status_and_hints() {
        let hud = build_hud(
            &state(Phase::Training, 2),
            Some(Duration::from_millis(12_340)),
            &ActionLabelStats::new(),
        );
        assert_eq!(hud.status, vec!["Session : s1", "Phase   : training", "Action  : 2"]);
        assert_eq!(hud.hints, vec!["Part 1 · training", "Next action switch in: 12.3s"]);
        assert!(hud.overlay.is_none());

        assert_eq!(hint_lines(Phase::Waiting, None), vec!["Press [S] to begin"]);
        assert_eq!(hint_lines(Phase::Done, None), vec!["Performance finished."]);
        assert_eq!(hint_lines(Phase::Transition, None)[1], "Listening to the system message…");
    }

    #[test]
    fn test_overlay_without_labels() {
        let overlay = audience_overlay(&state(Phase::Inference, 3), &ActionLabelStats::new()).unwrap();
        assert_eq!(overlay.headline, "(no audience labels yet for action 3)");
        assert!(!overlay.has_labels);
        assert!(overlay.side_title.is_none());
    }

    #[test]
    fn test_overlay_with_labels() {
        let mut labels = ActionLabelStats::new();
        labels.insert(1, vec![stat("clap", 90.0, 1), stat("wave", 70.0, 2), stat("spin", 0.0, 4)]);

        let overlay = audience_overlay(&state(Phase::Inference, 1), &labels).unwrap();
        assert_eq!(overlay.headline, "“clap”     confidence 90%    n=1");
        assert_eq!(overlay.side_title.as_deref(), Some("Other audience labels for action 1:"));
        assert_eq!(overlay.side.len(), 2);
        assert_eq!(overlay.side[0].text, "“wave”");
        assert_eq!(overlay.side[0].meta, "confidence 70%   n=2");
        assert_eq!((overlay.side[1].brightness, overlay.side[1].alpha), (130, 70));

        assert!(audience_overlay(&state(Phase::Training, 1), &labels).is_none());
        assert!(audience_overlay(&state(Phase::Inference, 0), &labels).is_none());
    }

    #[test]
    fn test_emphasis_range() {
        assert_eq!(emphasis(0.0), (130, 70));
        assert_eq!(emphasis(100.0), (255, 170));
        assert_eq!(emphasis(50.0), (193, 120));
        assert_eq!(emphasis(250.0), (255, 170));
        assert_eq!(emphasis(f64::NAN), (130, 70));
    }

    #[test]
    fn test_side_list_is_capped() {
        let mut labels = ActionLabelStats::new();
        let ranked = (0..30).map(|i| stat(&format!("l{i}"), 50.0, 1)).collect();
        labels.insert(2, ranked);

        let overlay = audience_overlay(&state(Phase::Inference, 2), &labels).unwrap();
        assert_eq!(overlay.side.len(), SIDE_LIST_LIMIT);
    }
}
