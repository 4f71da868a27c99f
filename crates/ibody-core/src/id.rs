//! Identity types
//!
//! Sessions and viewers are identified by short human-readable strings so
//! they can be used directly as store path segments.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Session id used when none is configured
pub const DEFAULT_SESSION_ID: &str = "session-001";

/// Prefix of generated viewer ids
pub const VIEWER_ID_PREFIX: &str = "viewer-";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Session identity - shared by the performer display and every viewer
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        SessionId::new(DEFAULT_SESSION_ID)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Viewer identity - stable per viewer device, never authenticated
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(String);

impl ViewerId {
    pub fn new(id: impl Into<String>) -> Self {
        ViewerId(id.into())
    }

    /// Generate a fresh id: `viewer-` followed by 8 base-36 characters
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = (0..8)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        ViewerId(format!("{VIEWER_ID_PREFIX}{suffix}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Viewer({})", self.0)
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
