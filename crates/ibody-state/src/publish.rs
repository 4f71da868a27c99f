//! Session state publishing
//!
//! The controller may recompute the same state every frame. The publisher
//! writes only when the canonical serialization differs from the last
//! successful write, stamping each write with the store's own clock.

use ibody_core::{IbodyResult, SessionId, SessionState};
use ibody_store::{server_timestamp, SharedStore, StorePath};
use serde_json::Value;

/// Deduplicating writer for `sessions/{id}/state`
#[derive(Debug)]
pub struct SessionPublisher {
    path: StorePath,
    last_published: Option<String>,
    published: u64,
    failing: bool,
}

impl SessionPublisher {
    pub fn new(session_id: &SessionId) -> IbodyResult<Self> {
        Ok(SessionPublisher {
            path: StorePath::session_state(session_id)?,
            last_published: None,
            published: 0,
            failing: false,
        })
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Number of writes that reached the store
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Write `state` unless it equals the last published state.
    ///
    /// Returns whether a write happened. A failed write leaves the cache
    /// untouched so the next call retries; only the first failure of a run
    /// is logged.
    pub fn publish_if_changed<S: SharedStore + ?Sized>(
        &mut self,
        state: &SessionState,
        store: &S,
    ) -> IbodyResult<bool> {
        let canonical = serde_json::to_string(state)?;
        if self.last_published.as_deref() == Some(canonical.as_str()) {
            return Ok(false);
        }

        let mut value = serde_json::to_value(state)?;
        if let Value::Object(map) = &mut value {
            map.insert("updatedAt".to_string(), server_timestamp());
        }

        match store.set(&self.path, value) {
            Ok(()) => {
                if self.failing {
                    tracing::info!(path = %self.path, "state publishing recovered");
                }
                tracing::debug!(
                    phase = %state.phase,
                    action = state.current_action,
                    "published session state"
                );
                self.failing = false;
                self.last_published = Some(canonical);
                self.published += 1;
                Ok(true)
            }
            Err(e) => {
                if !self.failing {
                    tracing::warn!(path = %self.path, error = %e, "state publish failed");
                }
                self.failing = true;
                Err(e)
            }
        }
    }

    /// Forget the cached state; the next call always writes
    pub fn invalidate(&mut self) {
        self.last_published = None;
    }
}
