//! Invisible Body State - what flows through the shared store
//!
//! This crate implements the three store-facing pipelines:
//! - Vote aggregation: full vote snapshot → ranked labels per action
//! - Vote intake: viewer form input → validated, appended vote
//! - Session publishing: controller state → deduplicated store writes

pub mod aggregate;
pub mod intake;
pub mod publish;

pub use aggregate::*;
pub use intake::*;
pub use publish::*;
