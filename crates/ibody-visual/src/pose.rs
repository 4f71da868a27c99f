//! Pose State - body landmarks as reported by the pose estimator
//!
//! Positions are in display coordinates. Scores are confidences in [0, 1].

use serde::{Deserialize, Serialize};

/// Body landmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyPart {
    // Head
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,

    // Arms
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,

    // Legs
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl BodyPart {
    /// All parts in estimator order
    pub fn all() -> &'static [BodyPart] {
        &[
            BodyPart::Nose,
            BodyPart::LeftEye,
            BodyPart::RightEye,
            BodyPart::LeftEar,
            BodyPart::RightEar,
            BodyPart::LeftShoulder,
            BodyPart::RightShoulder,
            BodyPart::LeftElbow,
            BodyPart::RightElbow,
            BodyPart::LeftWrist,
            BodyPart::RightWrist,
            BodyPart::LeftHip,
            BodyPart::RightHip,
            BodyPart::LeftKnee,
            BodyPart::RightKnee,
            BodyPart::LeftAnkle,
            BodyPart::RightAnkle,
        ]
    }

    /// Number of parts
    pub fn count() -> usize {
        17
    }
}

/// 2D position in display coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position2D {
    pub x: f32,
    pub y: f32,
}

impl Position2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Linear interpolation
    pub fn lerp(&self, other: &Position2D, t: f32) -> Position2D {
        Position2D {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn midpoint(&self, other: &Position2D) -> Position2D {
        self.lerp(other, 0.5)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Position2D {
        Position2D::new(self.x + dx, self.y + dy)
    }
}

/// One landmark estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: BodyPart,
    pub position: Position2D,
    pub score: f32,
}

impl Keypoint {
    pub fn new(part: BodyPart, position: Position2D, score: f32) -> Self {
        Self {
            part,
            position,
            score,
        }
    }

    /// Visible when the score exceeds `threshold`
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

/// One detected body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Overall detection confidence
    pub score: f32,
    /// Keypoints in estimator order
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(score: f32, keypoints: Vec<Keypoint>) -> Self {
        Self { score, keypoints }
    }

    /// First keypoint labelled `part`
    pub fn keypoint(&self, part: BodyPart) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.part == part)
    }

    /// Keypoint for `part` if it is visible at `threshold`
    pub fn visible(&self, part: BodyPart, threshold: f32) -> Option<&Keypoint> {
        self.keypoint(part).filter(|k| k.is_visible(threshold))
    }
}

/// Pick the pose to track out of one estimator tick.
///
/// Only a single body is followed: the highest-scoring detection, the
/// earliest one on ties (estimators report detections best-first).
pub fn primary_pose(poses: &[Pose]) -> Option<&Pose> {
    poses.iter().fold(None, |best: Option<&Pose>, pose| match best {
        Some(b) if b.score >= pose.score => Some(b),
        _ => Some(pose),
    })
}
