//! Store paths and the session-scoped layout
//!
//! ```text
//! sessions/{id}/state               one object, overwritten on publish
//! sessions/{id}/votes/action_{n}    append-only vote collection
//! ```

use std::fmt;

use ibody_core::{action_key, IbodyError, IbodyResult, SessionId};

const SESSIONS: &str = "sessions";
const STATE: &str = "state";
const VOTES: &str = "votes";

/// Slash-separated key path
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the store
    pub fn root() -> Self {
        StorePath::default()
    }

    /// Parse `a/b/c`. Leading and trailing slashes are ignored; empty
    /// inner segments are rejected.
    pub fn parse(path: &str) -> IbodyResult<Self> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(StorePath::root());
        }
        trimmed
            .split('/')
            .try_fold(StorePath::root(), |p, seg| p.child(seg))
    }

    /// Path extended by one segment
    pub fn child(&self, segment: &str) -> IbodyResult<Self> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(StorePath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// True if `self` equals `other` or lies above it
    pub fn is_ancestor_of(&self, other: &StorePath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True if one path contains the other
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }

    /// `sessions/{id}`
    pub fn session(id: &SessionId) -> IbodyResult<Self> {
        StorePath::root().child(SESSIONS)?.child(id.as_str())
    }

    /// `sessions/{id}/state`
    pub fn session_state(id: &SessionId) -> IbodyResult<Self> {
        StorePath::session(id)?.child(STATE)
    }

    /// `sessions/{id}/votes`
    pub fn session_votes(id: &SessionId) -> IbodyResult<Self> {
        StorePath::session(id)?.child(VOTES)
    }

    /// `sessions/{id}/votes/action_{n}`
    pub fn action_votes(id: &SessionId, action: u32) -> IbodyResult<Self> {
        StorePath::session_votes(id)?.child(&action_key(action))
    }
}

fn validate_segment(segment: &str) -> IbodyResult<()> {
    if segment.is_empty() {
        return Err(IbodyError::InvalidPath("empty path segment".into()));
    }
    if segment.contains('/') {
        return Err(IbodyError::InvalidPath(format!(
            "segment {segment:?} contains '/'"
        )));
    }
    if segment == "." || segment == ".." {
        return Err(IbodyError::InvalidPath(format!("relative segment {segment:?}")));
    }
    Ok(())
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath(/{})", self.segments.join("/"))
    }
}
