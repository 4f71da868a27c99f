//! Smoothing filter for noisy per-joint estimates
//!
//! Each retained keypoint position is a running exponential average of all
//! accepted raw samples for that slot. Low-confidence samples are ignored and
//! the previous estimate is kept as stale but still valid.

use crate::Pose;

/// Smoothing configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingConfig {
    /// Raw samples at or below this score are ignored
    pub score_threshold: f32,
    /// Weight of the raw sample when blending
    pub blend: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.2,
            blend: 0.4,
        }
    }
}

/// Exponential pose smoother
#[derive(Debug, Clone, Default)]
pub struct PoseSmoother {
    config: SmoothingConfig,
    smoothed: Option<Pose>,
}

impl PoseSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            config,
            smoothed: None,
        }
    }

    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }

    /// Fold a raw pose into the retained estimate and return it.
    ///
    /// The first observation is adopted verbatim. Afterwards keypoints are
    /// matched by index; slots present on only one side are skipped.
    pub fn update(&mut self, raw: &Pose) -> &Pose {
        let config = self.config;
        let smoothed = self.smoothed.get_or_insert_with(|| raw.clone());

        for (retained, sample) in smoothed.keypoints.iter_mut().zip(&raw.keypoints) {
            if sample.score > config.score_threshold {
                retained.position = retained.position.lerp(&sample.position, config.blend);
                retained.score = sample.score;
                retained.part = sample.part;
            }
        }

        smoothed
    }

    /// Current estimate, if any pose has been observed
    pub fn smoothed(&self) -> Option<&Pose> {
        self.smoothed.as_ref()
    }

    /// Forget the retained estimate
    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}
