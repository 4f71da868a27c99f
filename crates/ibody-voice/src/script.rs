//! Announcement scripts

use ibody_core::LabelStat;

/// Spoken once when the show moves from training to inference
pub const SECOND_PART_INTRO: &str = "Now we enter the second part. You are free to turn around and watch the real body, or stay with the projected system that you have helped to train.";

/// Characters that read badly aloud
const QUOTES: [char; 4] = ['"', '\u{201C}', '\u{201D}', '\''];

/// "Action {n}"
pub fn action_announcement(action: u32) -> String {
    format!("Action {action}")
}

/// Report of the top-ranked audience label for an action
pub fn label_report(top: &LabelStat) -> String {
    format!(
        "Top label: {}. Confidence {} percent.",
        speakable_label(&top.label),
        round_confidence(top.avg)
    )
}

/// Replace quote characters with spaces
pub fn speakable_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if QUOTES.contains(&c) { ' ' } else { c })
        .collect()
}

/// Round half up; non-finite averages read as zero
pub fn round_confidence(avg: f64) -> i64 {
    if !avg.is_finite() {
        return 0;
    }
    (avg + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotes_are_stripped() {
        assert_eq!(speakable_label("\u{201C}it's\u{201D} \"big\""), " it s   big ");
    }

    #[test]
    fn test_label_report() {
        let top = LabelStat {
            label: "a \"wave\"".into(),
            avg: 72.5,
            count: 3,
        };
        assert_eq!(
            label_report(&top),
            "Top label: a  wave . Confidence 73 percent."
        );
    }

    #[test]
    fn test_round_confidence() {
        assert_eq!(round_confidence(69.49), 69);
        assert_eq!(round_confidence(69.5), 70);
        assert_eq!(round_confidence(f64::NAN), 0);
        assert_eq!(action_announcement(3), "Action 3");
    }
}
