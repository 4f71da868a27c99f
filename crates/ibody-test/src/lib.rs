//! Invisible Body Test Harness
//!
//! A deterministic, single-threaded rendition of the whole show: one
//! performer display and any number of viewers sharing an in-memory store,
//! driven by a manual clock and a scripted speaker.

pub mod simulator;

pub use simulator::*;
