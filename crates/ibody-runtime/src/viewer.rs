//! Viewer client - the voting page
//!
//! Watches the session state and gates the vote form on it. Votes go
//! through the intake validator; nothing is written for a rejected draft.

use std::fs;
use std::path::Path;

use ibody_core::{IbodyResult, Phase, SessionId, SessionState, ViewerId};
use ibody_state::{SubmitError, VoteDraft, VoteIntake, VoteReceipt, SUBMIT_OK_MESSAGE};
use ibody_store::{SharedStore, SnapshotEvent, StorePath, Subscription};
use ibody_time::WallClock;
use rand::Rng;

/// How a form message is styled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTone {
    Ok,
    Error,
}

/// What the form shows and whether it accepts input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormGate {
    pub enabled: bool,
    pub message: String,
    pub tone: MessageTone,
    /// Connection line above the form
    pub status: String,
}

impl FormGate {
    fn new(enabled: bool, message: impl Into<String>, status: impl Into<String>) -> Self {
        FormGate {
            enabled,
            message: message.into(),
            tone: if enabled { MessageTone::Ok } else { MessageTone::Error },
            status: status.into(),
        }
    }
}

/// Form gating for an observed state (`None` before the first publish)
pub fn gate_for(session_id: &SessionId, observed: Option<&SessionState>) -> FormGate {
    let Some(state) = observed else {
        return FormGate::new(
            false,
            "You can vote once the training phase begins.",
            "Waiting for the performance to start…",
        );
    };

    let status = format!("Connected to session: {session_id}");
    if state.accepts_votes() {
        return FormGate::new(
            true,
            format!(
                "You are annotating action {} in the training phase.",
                state.current_action
            ),
            status,
        );
    }

    let message = match state.phase {
        Phase::Inference => "The system is now replaying your collective labels. New votes are disabled.",
        Phase::Done => "The performance has ended. Thank you for participating.",
        _ => "Waiting for the next segment to begin…",
    };
    FormGate::new(false, message, status)
}

/// Form gating after the state subscription failed
pub fn connection_error_gate() -> FormGate {
    FormGate::new(
        false,
        "Connection error.",
        "Could not connect to the live session. Please refresh later.",
    )
}

/// One viewer's page
pub struct ViewerClient<S, W> {
    intake: VoteIntake<S, W>,
    state_sub: Subscription,
    observed: Option<SessionState>,
    gate: FormGate,
    last_message: Option<(String, MessageTone)>,
}

impl<S: SharedStore, W: WallClock> ViewerClient<S, W> {
    pub fn new(store: S, wall: W, session_id: SessionId, viewer_id: ViewerId) -> IbodyResult<Self> {
        let state_sub = store.subscribe(&StorePath::session_state(&session_id)?);
        let gate = gate_for(&session_id, None);
        tracing::debug!(viewer = %viewer_id, session = %session_id, "viewer joined");

        Ok(ViewerClient {
            intake: VoteIntake::new(store, wall, session_id, viewer_id),
            state_sub,
            observed: None,
            gate,
            last_message: None,
        })
    }

    /// Accept votes for actions `1..=num_actions`
    pub fn with_num_actions(mut self, num_actions: u32) -> Self {
        self.intake = self.intake.with_num_actions(num_actions);
        self
    }

    pub fn viewer_id(&self) -> &ViewerId {
        self.intake.viewer_id()
    }

    pub fn session_id(&self) -> &SessionId {
        self.intake.session_id()
    }

    /// Last observed session state
    pub fn observed(&self) -> Option<&SessionState> {
        self.observed.as_ref()
    }

    pub fn gate(&self) -> &FormGate {
        &self.gate
    }

    /// Message left by the last submission attempt
    pub fn last_message(&self) -> Option<(&str, MessageTone)> {
        self.last_message.as_ref().map(|(m, t)| (m.as_str(), *t))
    }

    /// Apply a state change if one arrived. Returns whether it did.
    pub fn poll(&mut self) -> bool {
        match self.state_sub.poll_changed() {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Wait for the next state change. `None` once the store is gone.
    pub async fn next_change(&mut self) -> Option<&FormGate> {
        let event = self.state_sub.changed().await?;
        self.apply(event);
        Some(&self.gate)
    }

    fn apply(&mut self, event: SnapshotEvent) {
        match event {
            Ok(snapshot) => {
                let session_id = self.intake.session_id().clone();
                self.observed = snapshot
                    .as_ref()
                    .map(|value| SessionState::from_snapshot(value, &session_id));
                self.gate = gate_for(&session_id, self.observed.as_ref());
            }
            Err(e) => {
                // subscriptions keep delivering after an error; the last state stays
                tracing::warn!(viewer = %self.intake.viewer_id(), error = %e, "state subscription error");
                self.gate = connection_error_gate();
            }
        }
    }

    /// Submit a vote for the action last observed
    pub fn submit(&mut self, draft: &VoteDraft) -> Result<VoteReceipt, SubmitError> {
        let observed = self
            .observed
            .clone()
            .unwrap_or_else(|| SessionState::waiting(self.intake.session_id().clone()));

        let result = self.intake.submit(&observed, draft);
        self.last_message = Some(match &result {
            Ok(_) => (SUBMIT_OK_MESSAGE.to_string(), MessageTone::Ok),
            Err(e) => (e.user_message(), MessageTone::Error),
        });
        result
    }
}

/// Viewer id stored at `path`, or a fresh one written there
pub fn load_or_create_viewer_id<R: Rng + ?Sized>(path: &Path, rng: &mut R) -> IbodyResult<ViewerId> {
    if let Ok(content) = fs::read_to_string(path) {
        let id = content.trim();
        if !id.is_empty() {
            return Ok(ViewerId::new(id));
        }
    }

    let id = ViewerId::generate(rng);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, id.as_str())?;
    tracing::info!(viewer = %id, path = %path.display(), "created viewer id");
    Ok(id)
}
