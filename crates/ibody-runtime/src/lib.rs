//! Invisible Body Runtime - the two clients of the show
//!
//! The performer display and the viewer page run as independent loops and
//! only meet in the shared store:
//! - `performer`: frame loop around the phase controller, the only writer of
//!   session state
//! - `viewer`: form gating on observed state and vote submission
//! - `controller`: the timed phase state machine and its announcements
//! - `hud`: status lines and the audience label overlay
//! - `config` / `logging`: ambient setup for the `ibody-show` binary
//! - `synthetic`: stand-in pose estimator and audience for rehearsals

pub mod config;
pub mod controller;
pub mod hud;
pub mod logging;
pub mod performer;
pub mod synthetic;
pub mod viewer;

pub use config::*;
pub use controller::*;
pub use hud::*;
pub use logging::*;
pub use performer::*;
pub use synthetic::*;
pub use viewer::*;
