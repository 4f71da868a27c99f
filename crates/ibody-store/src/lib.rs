//! Invisible Body Store - the shared realtime store
//!
//! The performer display and the viewer pages never talk to each other
//! directly. They meet in an eventually-consistent key-path store:
//! - `set` is a fire-and-forget upsert of a whole subtree
//! - `push` appends under a generated, time-ordered key
//! - `subscribe` delivers the latest snapshot at a path on every change
//!
//! Consumers always re-derive from the full snapshot, so coalesced or
//! reordered notifications cannot corrupt anything.

pub mod memory;
pub mod path;

pub use memory::*;
pub use path::*;

use ibody_core::{IbodyError, IbodyResult};
use serde_json::{json, Value};
use tokio::sync::watch;

/// Latest observation at a subscribed path: the subtree (absent = `None`)
/// or the transport error that interrupted the subscription
pub type SnapshotEvent = Result<Option<Value>, IbodyError>;

/// Placeholder resolved by the store to its own clock at write time
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

/// Whether `value` is the server timestamp placeholder
pub fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|o| o.len() == 1 && o.get(".sv").and_then(Value::as_str) == Some("timestamp"))
}

/// Shared key-path store
pub trait SharedStore: Send + Sync {
    /// Overwrite the subtree at `path`. `Value::Null` deletes it.
    fn set(&self, path: &StorePath, value: Value) -> IbodyResult<()>;

    /// Append `value` under a fresh child key of `path`; returns the key
    fn push(&self, path: &StorePath, value: Value) -> IbodyResult<String>;

    /// Read the subtree at `path`
    fn get(&self, path: &StorePath) -> IbodyResult<Option<Value>>;

    /// Watch the subtree at `path`
    fn subscribe(&self, path: &StorePath) -> Subscription;
}

impl<S: SharedStore + ?Sized> SharedStore for std::sync::Arc<S> {
    fn set(&self, path: &StorePath, value: Value) -> IbodyResult<()> {
        (**self).set(path, value)
    }

    fn push(&self, path: &StorePath, value: Value) -> IbodyResult<String> {
        (**self).push(path, value)
    }

    fn get(&self, path: &StorePath) -> IbodyResult<Option<Value>> {
        (**self).get(path)
    }

    fn subscribe(&self, path: &StorePath) -> Subscription {
        (**self).subscribe(path)
    }
}

/// Push-based view of one path.
///
/// Bursts of changes coalesce into the latest snapshot. The snapshot present
/// at subscription time counts as the first change.
#[derive(Debug)]
pub struct Subscription {
    path: StorePath,
    rx: watch::Receiver<SnapshotEvent>,
    fresh: bool,
}

impl Subscription {
    pub fn new(path: StorePath, rx: watch::Receiver<SnapshotEvent>) -> Self {
        Subscription {
            path,
            rx,
            fresh: true,
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Latest snapshot if it changed since the last call, without waiting
    pub fn poll_changed(&mut self) -> Option<SnapshotEvent> {
        let changed = self.fresh || self.rx.has_changed().unwrap_or(false);
        if !changed {
            return None;
        }
        self.fresh = false;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait for the next change. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<SnapshotEvent> {
        if !self.fresh {
            self.rx.changed().await.ok()?;
        }
        self.fresh = false;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Latest snapshot regardless of change tracking
    pub fn latest(&self) -> SnapshotEvent {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_timestamp_detection() {
        assert!(is_server_timestamp(&server_timestamp()));
        assert!(!is_server_timestamp(&json!({".sv": "other"})));
        assert!(!is_server_timestamp(&json!({".sv": "timestamp", "x": 1})));
        assert!(!is_server_timestamp(&json!(12)));
    }
}
