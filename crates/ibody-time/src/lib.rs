//! Invisible Body Time - Clocks and segment scheduling
//!
//! This crate provides:
//! - The clock abstraction read by the phase controller (monotonic or manual)
//! - A wall clock for vote timestamps
//! - The segment schedule mapping elapsed time to the active action

pub mod clock;
pub mod schedule;

pub use clock::*;
pub use schedule::*;
