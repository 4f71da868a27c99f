//! Invisible Body Voice
//!
//! Speech is an external collaborator. The core never blocks on it: every
//! utterance is fire-and-forget and returns a ticket, and completions are
//! reported back later by polling the speaker.
//!
//! - `speaker`: the collaborator trait and stock implementations
//! - `script`: the words spoken during the show

pub mod script;
pub mod speaker;

pub use script::*;
pub use speaker::*;
