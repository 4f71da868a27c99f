//! Vote intake
//!
//! Turns raw viewer form input into a stored vote. Validation happens
//! before any write: a rejected draft never reaches the store.

use ibody_core::{IbodyError, SessionId, SessionState, ViewerId, Vote, MAX_CONFIDENCE, MIN_CONFIDENCE};
use ibody_store::{SharedStore, StorePath};
use ibody_time::{ScheduleConfig, WallClock};
use thiserror::Error;

/// Shown after a vote was appended
pub const SUBMIT_OK_MESSAGE: &str = "Thank you. Your annotation has been recorded.";

/// Why a draft was refused before reaching the store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoteRejection {
    #[error("You can only submit during the training phase when an action is active.")]
    NotAccepting,

    #[error("Please describe the action before submitting.")]
    EmptyLabel,

    #[error("Confidence must be a number between 0 and 100.")]
    InvalidConfidence,

    #[error("Confidence must be a number between 0 and 100 (got {0}).")]
    ConfidenceOutOfRange(f64),
}

/// Submission failures, displayed as user-facing messages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] VoteRejection),

    #[error("Submission failed. Please try again in a moment.")]
    Transport(IbodyError),
}

impl SubmitError {
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, SubmitError::Rejected(_))
    }
}

/// Raw form input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteDraft {
    pub label: String,
    pub confidence: String,
}

impl VoteDraft {
    pub fn new(label: impl Into<String>, confidence: impl Into<String>) -> Self {
        VoteDraft {
            label: label.into(),
            confidence: confidence.into(),
        }
    }
}

/// A draft that passed validation against the observed state
#[derive(Debug, Clone, PartialEq)]
pub struct ValidVote {
    pub action: u32,
    pub label: String,
    pub confidence: f64,
}

/// Validate a draft against the session state the viewer last observed.
///
/// Checks run in order: phase and action, label, confidence. The action
/// must lie in `1..=num_actions`. A blank confidence reads as 0.
pub fn validate_vote(
    state: &SessionState,
    draft: &VoteDraft,
    num_actions: u32,
) -> Result<ValidVote, VoteRejection> {
    if !state.accepts_votes() || state.current_action > num_actions {
        return Err(VoteRejection::NotAccepting);
    }

    let label = draft.label.trim();
    if label.is_empty() {
        return Err(VoteRejection::EmptyLabel);
    }

    let confidence = match draft.confidence.trim() {
        "" => 0.0,
        text => text
            .parse::<f64>()
            .map_err(|_| VoteRejection::InvalidConfidence)?,
    };
    if !confidence.is_finite() {
        return Err(VoteRejection::InvalidConfidence);
    }
    if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence) {
        return Err(VoteRejection::ConfidenceOutOfRange(confidence));
    }

    Ok(ValidVote {
        action: state.current_action,
        label: label.to_string(),
        confidence,
    })
}

/// A vote that reached the store
#[derive(Debug, Clone, PartialEq)]
pub struct VoteReceipt {
    pub key: String,
    pub path: StorePath,
    pub vote: Vote,
}

/// Per-viewer vote submitter
pub struct VoteIntake<S, W> {
    store: S,
    wall: W,
    session_id: SessionId,
    viewer_id: ViewerId,
    num_actions: u32,
}

impl<S: SharedStore, W: WallClock> VoteIntake<S, W> {
    pub fn new(store: S, wall: W, session_id: SessionId, viewer_id: ViewerId) -> Self {
        VoteIntake {
            store,
            wall,
            session_id,
            viewer_id,
            num_actions: ScheduleConfig::default().num_actions,
        }
    }

    /// Accept votes for actions `1..=num_actions`
    pub fn with_num_actions(mut self, num_actions: u32) -> Self {
        self.num_actions = num_actions;
        self
    }

    pub fn num_actions(&self) -> u32 {
        self.num_actions
    }

    pub fn viewer_id(&self) -> &ViewerId {
        &self.viewer_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Validate and append a vote for the action in `state`
    pub fn submit(&self, state: &SessionState, draft: &VoteDraft) -> Result<VoteReceipt, SubmitError> {
        let valid = validate_vote(state, draft, self.num_actions)?;

        let vote = Vote {
            viewer_id: self.viewer_id.clone(),
            phase: state.phase,
            action: valid.action,
            label: valid.label,
            confidence: valid.confidence,
            created_at: self.wall.unix_millis(),
        };

        let path = StorePath::action_votes(&self.session_id, vote.action).map_err(SubmitError::Transport)?;
        let value = serde_json::to_value(&vote).map_err(|e| SubmitError::Transport(e.into()))?;

        match self.store.push(&path, value) {
            Ok(key) => {
                tracing::info!(
                    viewer = %self.viewer_id,
                    action = vote.action,
                    key = %key,
                    "vote recorded"
                );
                Ok(VoteReceipt { key, path, vote })
            }
            Err(e) => {
                tracing::warn!(viewer = %self.viewer_id, error = %e, "vote submission failed");
                Err(SubmitError::Transport(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibody_core::Phase;
    use ibody_store::MemoryStore;
    use ibody_time::ManualClock;

    fn training(action: u32) -> SessionState {
        SessionState {
            phase: Phase::Training,
            current_action: action,
            session_id: SessionId::new("s1"),
        }
    }

    fn intake(store: &MemoryStore) -> VoteIntake<MemoryStore, ManualClock> {
        VoteIntake::new(
            store.clone(),
            ManualClock::with_wall_epoch(1_700_000_000_000),
            SessionId::new("s1"),
            ViewerId::new("viewer-abc12345"),
        )
    }

    #[test]
    fn test_validation_order() {
        let waiting = SessionState::waiting(SessionId::new("s1"));
        assert_eq!(
            validate_vote(&waiting, &VoteDraft::new("", "abc"), 4),
            Err(VoteRejection::NotAccepting)
        );
        assert_eq!(
            validate_vote(&training(1), &VoteDraft::new("   ", "abc"), 4),
            Err(VoteRejection::EmptyLabel)
        );
        assert_eq!(
            validate_vote(&training(1), &VoteDraft::new("wave", "abc"), 4),
            Err(VoteRejection::InvalidConfidence)
        );
    }

    #[test]
    fn test_confidence_bounds() {
        let state = training(2);
        for ok in ["0", "100", " 55.5 "] {
            assert!(validate_vote(&state, &VoteDraft::new("wave", ok), 4).is_ok(), "{ok}");
        }
        for bad in ["NaN", "inf", "ten"] {
            assert_eq!(
                validate_vote(&state, &VoteDraft::new("wave", bad), 4),
                Err(VoteRejection::InvalidConfidence),
                "{bad}"
            );
        }
        assert_eq!(
            validate_vote(&state, &VoteDraft::new("wave", "-1"), 4),
            Err(VoteRejection::ConfidenceOutOfRange(-1.0))
        );
    }

    #[test]
    fn test_blank_confidence_reads_as_zero() {
        for blank in ["", "   "] {
            let valid = validate_vote(&training(1), &VoteDraft::new("wave", blank), 4).unwrap();
            assert_eq!(valid.confidence, 0.0);
        }
    }

    #[test]
    fn test_action_beyond_schedule_rejected() {
        assert_eq!(
            validate_vote(&training(7), &VoteDraft::new("wave", "50"), 4),
            Err(VoteRejection::NotAccepting)
        );
        assert!(validate_vote(&training(4), &VoteDraft::new("wave", "50"), 4).is_ok());

        let store = MemoryStore::new();
        let err = intake(&store)
            .submit(&training(5), &VoteDraft::new("wave", "50"))
            .unwrap_err();
        assert_eq!(err, SubmitError::Rejected(VoteRejection::NotAccepting));
        assert_eq!(store.write_count(), 0);

        let receipt = intake(&store)
            .with_num_actions(6)
            .submit(&training(5), &VoteDraft::new("wave", "50"))
            .unwrap();
        assert_eq!(receipt.vote.action, 5);
    }

    #[test]
    fn test_training_action_zero_rejected() {
        assert_eq!(
            validate_vote(&training(0), &VoteDraft::new("wave", "50"), 4),
            Err(VoteRejection::NotAccepting)
        );
    }

    #[test]
    fn test_submit_appends_trimmed_vote() {
        let store = MemoryStore::new();
        let receipt = intake(&store)
            .submit(&training(2), &VoteDraft::new("  wave hands ", "80"))
            .unwrap();

        assert_eq!(receipt.path.to_string(), "sessions/s1/votes/action_2");
        assert_eq!(receipt.vote.label, "wave hands");
        assert_eq!(receipt.vote.created_at, 1_700_000_000_000);

        let stored = store.get(&receipt.path.child(&receipt.key).unwrap()).unwrap().unwrap();
        assert_eq!(stored["label"], "wave hands");
        assert_eq!(stored["confidence"], 80.0);
        assert_eq!(stored["viewerId"], "viewer-abc12345");
        assert_eq!(stored["phase"], "training");
        assert_eq!(stored["action"], 2);
    }

    #[test]
    fn test_out_of_range_never_writes() {
        let store = MemoryStore::new();
        let err = intake(&store)
            .submit(&training(1), &VoteDraft::new("wave", "150"))
            .unwrap_err();

        assert_eq!(err, SubmitError::Rejected(VoteRejection::ConfidenceOutOfRange(150.0)));
        assert!(err.user_message().contains("150"));
        assert!(err.is_rejection());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_transport_failure_message() {
        let store = MemoryStore::new();
        store.set_online(false);
        let err = intake(&store)
            .submit(&training(1), &VoteDraft::new("wave", "50"))
            .unwrap_err();

        assert!(!err.is_rejection());
        assert_eq!(err.user_message(), "Submission failed. Please try again in a moment.");
    }
}
