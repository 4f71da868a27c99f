//! Synthetic inputs for rehearsals and simulations
//!
//! A swaying figure in place of the pose estimator, and an audience that
//! writes plausible (and sometimes sloppy) votes.

use std::f32::consts::TAU;
use std::time::Duration;

use ibody_core::PerformanceTime;
use ibody_state::VoteDraft;
use ibody_visual::{BodyPart, Keypoint, Pose, Position2D};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Labels the synthetic audience reaches for, per action
const LABEL_BANK: [&[&str]; 4] = [
    &["waving", "wave", "hello", "swimming"],
    &["clapping", "clap", "applause"],
    &["spinning", "dance", "turning around"],
    &["bowing", "bow", "goodbye", "stretching"],
];

/// Fallback labels for actions beyond the bank
const GENERIC_LABELS: &[&str] = &["moving", "dancing", "walking"];

/// Rest position of each keypoint relative to the figure centre
fn rest_offset(part: BodyPart) -> (f32, f32) {
    match part {
        BodyPart::Nose => (0.0, -160.0),
        BodyPart::LeftEye => (-8.0, -168.0),
        BodyPart::RightEye => (8.0, -168.0),
        BodyPart::LeftEar => (-16.0, -162.0),
        BodyPart::RightEar => (16.0, -162.0),
        BodyPart::LeftShoulder => (-50.0, -110.0),
        BodyPart::RightShoulder => (50.0, -110.0),
        BodyPart::LeftElbow => (-80.0, -40.0),
        BodyPart::RightElbow => (80.0, -40.0),
        BodyPart::LeftWrist => (-95.0, 20.0),
        BodyPart::RightWrist => (95.0, 20.0),
        BodyPart::LeftHip => (-30.0, 20.0),
        BodyPart::RightHip => (30.0, 20.0),
        BodyPart::LeftKnee => (-35.0, 120.0),
        BodyPart::RightKnee => (35.0, 120.0),
        BodyPart::LeftAnkle => (-38.0, 220.0),
        BodyPart::RightAnkle => (38.0, 220.0),
    }
}

/// Stand-in pose estimator
#[derive(Debug)]
pub struct SyntheticPoses {
    rng: StdRng,
    center: Position2D,
    /// Positional noise in pixels
    jitter: f32,
    /// Chance that a tick detects nobody
    dropout: f64,
}

impl SyntheticPoses {
    pub fn new(seed: u64) -> Self {
        SyntheticPoses {
            rng: StdRng::seed_from_u64(seed),
            center: Position2D::new(640.0, 360.0),
            jitter: 6.0,
            dropout: 0.02,
        }
    }

    /// Detections for one estimator tick: zero or one body
    pub fn sample(&mut self, now: PerformanceTime) -> Vec<Pose> {
        if self.rng.gen_bool(self.dropout) {
            return Vec::new();
        }

        let phase = (now.as_millis() % 4_000) as f32 / 4_000.0;
        let sway = 40.0 * (phase * TAU).sin();

        let keypoints: Vec<Keypoint> = BodyPart::all()
            .iter()
            .map(|&part| {
                let (dx, dy) = rest_offset(part);
                let noise_x = self.rng.gen_range(-self.jitter..=self.jitter);
                let noise_y = self.rng.gen_range(-self.jitter..=self.jitter);
                let score = self.rng.gen_range(0.05f32..1.0);
                Keypoint::new(part, self.center.offset(dx + sway + noise_x, dy + noise_y), score)
            })
            .collect();

        let score = keypoints.iter().map(|k| k.score).sum::<f32>() / keypoints.len() as f32;
        vec![Pose::new(score, keypoints)]
    }
}

/// Vote drafts written by simulated viewers
#[derive(Debug)]
pub struct SyntheticAudience {
    rng: StdRng,
    /// Chance that a draft is sloppy (blank label or out-of-range confidence)
    sloppiness: f64,
}

impl SyntheticAudience {
    pub fn new(seed: u64) -> Self {
        SyntheticAudience {
            rng: StdRng::seed_from_u64(seed),
            sloppiness: 0.05,
        }
    }

    /// Audience that only writes valid drafts
    pub fn careful(seed: u64) -> Self {
        SyntheticAudience {
            sloppiness: 0.0,
            ..Self::new(seed)
        }
    }

    /// How long a viewer takes to write a vote once an action starts
    pub fn think_time(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(1_000..=12_000))
    }

    pub fn draft_for(&mut self, action: u32) -> VoteDraft {
        if self.rng.gen_bool(self.sloppiness) {
            return if self.rng.gen_bool(0.5) {
                VoteDraft::new("   ", "50")
            } else {
                VoteDraft::new("wave", "150")
            };
        }

        let bank = usize::try_from(action)
            .ok()
            .and_then(|a| a.checked_sub(1))
            .and_then(|i| LABEL_BANK.get(i).copied())
            .unwrap_or(GENERIC_LABELS);
        let label = bank.choose(&mut self.rng).copied().unwrap_or("moving");
        let confidence = self.rng.gen_range(30..=100);

        VoteDraft::new(label, confidence.to_string())
    }
}
