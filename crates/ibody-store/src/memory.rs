//! In-memory store
//!
//! A JSON tree behind a mutex. Every write notifies the subscribers whose
//! path overlaps the written path with their fresh snapshot. The store can
//! be taken offline to exercise transport failures.

use std::sync::Arc;

use ibody_core::{IbodyError, IbodyResult};
use ibody_time::{SystemWallClock, WallClock};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::{is_server_timestamp, SharedStore, SnapshotEvent, StorePath, Subscription};

const KEY_SUFFIX_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

struct Subscriber {
    path: StorePath,
    tx: watch::Sender<SnapshotEvent>,
}

struct Inner {
    root: Value,
    subscribers: Vec<Subscriber>,
    online: bool,
    push_counter: u64,
    rng: StdRng,
    wall: Box<dyn WallClock + Send>,
    writes: u64,
}

/// Shared in-memory store; clones share the same tree
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_wall_clock(SystemWallClock)
    }

    /// Store resolving server timestamps from `wall`
    pub fn with_wall_clock(wall: impl WallClock + Send + 'static) -> Self {
        MemoryStore {
            inner: Arc::new(Mutex::new(Inner {
                root: Value::Object(Map::new()),
                subscribers: Vec::new(),
                online: true,
                push_counter: 0,
                rng: StdRng::from_entropy(),
                wall: Box::new(wall),
                writes: 0,
            })),
        }
    }

    /// Deterministic push-key suffixes
    pub fn with_seed(self, seed: u64) -> Self {
        self.inner.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Take the store off- or online.
    ///
    /// Going offline fails subsequent writes and reports a transport error
    /// to every subscriber; coming back re-delivers current snapshots.
    pub fn set_online(&self, online: bool) {
        let mut inner = self.inner.lock();
        if inner.online == online {
            return;
        }
        inner.online = online;
        tracing::debug!(online, "memory store connectivity changed");

        if online {
            inner.notify(&StorePath::root());
        } else {
            inner.subscribers.retain(|s| {
                s.tx
                    .send(Err(IbodyError::Transport("connection lost".into())))
                    .is_ok()
            });
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock().online
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> u64 {
        self.inner.lock().writes
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|s| !s.tx.is_closed());
        inner.subscribers.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MemoryStore")
            .field("online", &inner.online)
            .field("subscribers", &inner.subscribers.len())
            .field("writes", &inner.writes)
            .finish()
    }
}

impl Inner {
    fn ensure_online(&self) -> IbodyResult<()> {
        if self.online {
            Ok(())
        } else {
            Err(IbodyError::Transport("store offline".into()))
        }
    }

    fn write(&mut self, path: &StorePath, mut value: Value) {
        let now = self.wall.unix_millis();
        resolve_server_values(&mut value, now);

        if value.is_null() {
            remove(&mut self.root, path);
        } else {
            insert(&mut self.root, path, value);
        }
        self.writes += 1;
        self.notify(path);
    }

    fn notify(&mut self, written: &StorePath) {
        let root = &self.root;
        self.subscribers.retain(|s| {
            if !s.path.overlaps(written) {
                return !s.tx.is_closed();
            }
            let snapshot = lookup(root, &s.path).cloned();
            s.tx.send(Ok(snapshot)).is_ok()
        });
    }

    /// Time-ordered key: lexical order follows push order
    fn next_push_key(&mut self) -> String {
        let millis = self.wall.unix_millis();
        let counter = self.push_counter;
        self.push_counter += 1;
        let suffix: String = (0..4)
            .map(|_| KEY_SUFFIX_CHARS[self.rng.gen_range(0..KEY_SUFFIX_CHARS.len())] as char)
            .collect();
        format!("{millis:013}-{counter:08}-{suffix}")
    }
}

impl SharedStore for MemoryStore {
    fn set(&self, path: &StorePath, value: Value) -> IbodyResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_online()?;
        inner.write(path, value);
        Ok(())
    }

    fn push(&self, path: &StorePath, value: Value) -> IbodyResult<String> {
        let mut inner = self.inner.lock();
        inner.ensure_online()?;
        let key = inner.next_push_key();
        let child = path.child(&key)?;
        inner.write(&child, value);
        Ok(key)
    }

    fn get(&self, path: &StorePath) -> IbodyResult<Option<Value>> {
        let inner = self.inner.lock();
        inner.ensure_online()?;
        Ok(lookup(&inner.root, path).cloned())
    }

    fn subscribe(&self, path: &StorePath) -> Subscription {
        let mut inner = self.inner.lock();
        let initial = if inner.online {
            Ok(lookup(&inner.root, path).cloned())
        } else {
            Err(IbodyError::Transport("store offline".into()))
        };
        let (tx, rx) = watch::channel(initial);
        inner.subscribers.push(Subscriber {
            path: path.clone(),
            tx,
        });
        Subscription::new(path.clone(), rx)
    }
}

fn resolve_server_values(value: &mut Value, now: u64) {
    if is_server_timestamp(value) {
        *value = Value::from(now);
        return;
    }
    match value {
        Value::Object(map) => map.values_mut().for_each(|v| resolve_server_values(v, now)),
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_server_values(v, now)),
        _ => {}
    }
}

fn lookup<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, seg| node.as_object()?.get(seg))
}

fn insert(root: &mut Value, path: &StorePath, value: Value) {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for seg in parents {
        node = object_mut(node)
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_mut(node).insert(last.clone(), value);
}

/// View `node` as an object, replacing any scalar in the way
fn object_mut(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

fn remove(root: &mut Value, path: &StorePath) {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = Value::Object(Map::new());
        return;
    };

    let parent = parents
        .iter()
        .try_fold(root, |node, seg| node.as_object_mut()?.get_mut(seg));
    if let Some(Value::Object(map)) = parent {
        map.remove(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_timestamp;
    use ibody_time::ManualClock;
    use serde_json::json;

    fn path(p: &str) -> StorePath {
        StorePath::parse(p).unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set(&path("sessions/s/state"), json!({"phase": "training"})).unwrap();

        assert_eq!(
            store.get(&path("sessions/s")).unwrap(),
            Some(json!({"state": {"phase": "training"}}))
        );
        assert_eq!(store.get(&path("sessions/other")).unwrap(), None);
    }

    #[test]
    fn test_null_deletes() {
        let store = MemoryStore::new();
        store.set(&path("a/b"), json!(1)).unwrap();
        store.set(&path("a/b"), Value::Null).unwrap();

        assert_eq!(store.get(&path("a/b")).unwrap(), None);
        assert_eq!(store.get(&path("a")).unwrap(), Some(json!({})));
    }

    #[test]
    fn test_server_timestamp_resolved() {
        let clock = ManualClock::with_wall_epoch(1_700_000_000_000);
        let store = MemoryStore::with_wall_clock(clock);

        store
            .set(&path("s/state"), json!({"phase": "done", "updatedAt": server_timestamp()}))
            .unwrap();

        let state = store.get(&path("s/state")).unwrap().unwrap();
        assert_eq!(state["updatedAt"], json!(1_700_000_000_000u64));
    }

    #[test]
    fn test_push_keys_are_ordered() {
        let store = MemoryStore::new().with_seed(1);
        let votes = path("sessions/s/votes/action_1");

        let keys: Vec<String> = (0..20)
            .map(|i| store.push(&votes, json!({"n": i})).unwrap())
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);

        let all = store.get(&votes).unwrap().unwrap();
        assert_eq!(all.as_object().unwrap().len(), 20);
    }

    #[test]
    fn test_subscription_sees_descendant_writes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&path("sessions/s/votes"));

        // initial snapshot counts as a change
        assert_eq!(sub.poll_changed(), Some(Ok(None)));
        assert_eq!(sub.poll_changed(), None);

        store.push(&path("sessions/s/votes/action_2"), json!({"label": "wave"})).unwrap();
        let snapshot = sub.poll_changed().unwrap().unwrap().unwrap();
        assert!(snapshot.get("action_2").is_some());

        // unrelated write does not notify
        store.set(&path("sessions/s/state"), json!({})).unwrap();
        assert_eq!(sub.poll_changed(), None);
    }

    #[test]
    fn test_offline_fails_writes_and_notifies() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&path("sessions/s/state"));
        sub.poll_changed();

        store.set_online(false);
        assert!(matches!(
            store.set(&path("sessions/s/state"), json!({})),
            Err(IbodyError::Transport(_))
        ));
        assert!(matches!(sub.poll_changed(), Some(Err(IbodyError::Transport(_)))));

        store.set_online(true);
        assert_eq!(sub.poll_changed(), Some(Ok(None)));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_dropped_subscriptions_are_pruned() {
        let store = MemoryStore::new();
        let sub = store.subscribe(&path("x"));
        assert_eq!(store.subscriber_count(), 1);

        drop(sub);
        store.set(&path("x"), json!(1)).unwrap();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_async_change_notification() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&path("sessions/s/state"));
        assert_eq!(sub.changed().await, Some(Ok(None)));

        let writer = store.clone();
        tokio::spawn(async move {
            writer
                .set(&path("sessions/s/state"), json!({"phase": "training"}))
                .unwrap();
        });

        let event = sub.changed().await.unwrap().unwrap();
        assert_eq!(event, Some(json!({"phase": "training"})));
    }
}
