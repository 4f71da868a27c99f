//! Session state - the single authoritative record of where the show is
//!
//! Owned and mutated only by the phase controller on the performer display,
//! read-only for viewers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SessionId;

/// Action index meaning "no action active"
pub const NO_ACTION: u32 = 0;

/// Macro-stage of the performance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Waiting,
    Training,
    Transition,
    Inference,
    Done,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Waiting,
            Phase::Training,
            Phase::Transition,
            Phase::Inference,
            Phase::Done,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Training => "training",
            Phase::Transition => "transition",
            Phase::Inference => "inference",
            Phase::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Phase::all().iter().copied().find(|p| p.as_str() == s)
    }

    /// Phases whose action index is derived from elapsed time
    pub fn is_timed(self) -> bool {
        matches!(self, Phase::Training | Phase::Inference)
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Done
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: Phase,
    pub current_action: u32,
    pub session_id: SessionId,
}

impl SessionState {
    /// Implicit state at session start
    pub fn waiting(session_id: SessionId) -> Self {
        SessionState {
            phase: Phase::Waiting,
            current_action: NO_ACTION,
            session_id,
        }
    }

    /// Viewers may only submit while an action is being trained
    pub fn accepts_votes(&self) -> bool {
        self.phase == Phase::Training && self.current_action > NO_ACTION
    }

    /// Read a state object as observed in the store.
    ///
    /// Lenient: a missing or unknown phase reads as waiting, a missing or
    /// non-numeric action as no action, a missing session id as `fallback`.
    pub fn from_snapshot(value: &Value, fallback: &SessionId) -> Self {
        let phase = value
            .get("phase")
            .and_then(Value::as_str)
            .and_then(Phase::parse)
            .unwrap_or_default();

        let current_action = value
            .get("currentAction")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(NO_ACTION);

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .map(SessionId::new)
            .unwrap_or_else(|| fallback.clone());

        SessionState {
            phase,
            current_action,
            session_id,
        }
    }
}
