//! Invisible Body Visual State
//!
//! The projected overlay is driven by pose STATE, not by camera frames.
//! The external pose estimator is a black box that yields keypoints with
//! confidence scores; this crate owns everything after that:
//!
//! - Keypoint and pose types (17 body landmarks)
//! - Frame-to-frame exponential smoothing of noisy estimates
//! - Skeleton layout geometry (what to draw, not how)
//! - The per-action colour palette

pub mod palette;
pub mod pose;
pub mod skeleton;
pub mod smoothing;

pub use palette::*;
pub use pose::*;
pub use skeleton::*;
pub use smoothing::*;
