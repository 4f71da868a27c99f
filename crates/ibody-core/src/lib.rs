//! Invisible Body Core - Fundamental types and primitives
//!
//! This crate defines the types shared by the performer display and the
//! viewer page:
//! - Identifiers (SessionId, ViewerId)
//! - Time primitives (PerformanceTime)
//! - Session state (Phase, SessionState)
//! - Votes and derived label statistics

pub mod id;
pub mod time;
pub mod session;
pub mod vote;
pub mod error;

pub use id::*;
pub use time::*;
pub use session::*;
pub use vote::*;
pub use error::*;
