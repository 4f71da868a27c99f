//! Skeleton layout - the shapes of the projected overlay
//!
//! Turns a (smoothed) pose into geometry: a head circle, a torso outline,
//! bone segments and joint dots. Rasterisation is left to the display.

use crate::{BodyPart, Pose, Position2D};

/// Layout configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonConfig {
    /// Keypoints at or below this score are not drawn
    pub visibility_threshold: f32,
    pub head_radius: f32,
    pub eye_radius: f32,
    pub ear_radius: f32,
    pub joint_radius: f32,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.3,
            head_radius: 18.0,
            eye_radius: 2.0,
            ear_radius: 1.5,
            joint_radius: 5.0,
        }
    }
}

/// Filled or outlined circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Position2D,
    pub radius: f32,
}

/// Straight stroke between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Position2D,
    pub to: Position2D,
}

/// Everything to draw for one pose
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonLayout {
    /// Outlined head circle
    pub head: Option<Circle>,
    /// Closed outline: left shoulder, right shoulder, right hip, left hip
    pub torso: Option<[Position2D; 4]>,
    /// Spine, neck and limb strokes
    pub bones: Vec<Segment>,
    /// Facial feature and joint dots
    pub dots: Vec<Circle>,
}

impl SkeletonLayout {
    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.torso.is_none() && self.bones.is_empty() && self.dots.is_empty()
    }
}

const LIMBS: [(BodyPart, BodyPart); 8] = [
    (BodyPart::LeftShoulder, BodyPart::LeftElbow),
    (BodyPart::LeftElbow, BodyPart::LeftWrist),
    (BodyPart::RightShoulder, BodyPart::RightElbow),
    (BodyPart::RightElbow, BodyPart::RightWrist),
    (BodyPart::LeftHip, BodyPart::LeftKnee),
    (BodyPart::LeftKnee, BodyPart::LeftAnkle),
    (BodyPart::RightHip, BodyPart::RightKnee),
    (BodyPart::RightKnee, BodyPart::RightAnkle),
];

const JOINTS: [BodyPart; 12] = [
    BodyPart::LeftShoulder,
    BodyPart::RightShoulder,
    BodyPart::LeftHip,
    BodyPart::RightHip,
    BodyPart::LeftElbow,
    BodyPart::RightElbow,
    BodyPart::LeftWrist,
    BodyPart::RightWrist,
    BodyPart::LeftKnee,
    BodyPart::RightKnee,
    BodyPart::LeftAnkle,
    BodyPart::RightAnkle,
];

/// Build the overlay geometry for a pose
pub fn layout_skeleton(pose: &Pose, config: &SkeletonConfig) -> SkeletonLayout {
    let at = |part: BodyPart| {
        pose.visible(part, config.visibility_threshold)
            .map(|k| k.position)
    };

    let mut layout = SkeletonLayout::default();

    // Head: nose, else midpoint of the eyes
    let head_center = at(BodyPart::Nose).or_else(|| {
        let (l, r) = (at(BodyPart::LeftEye)?, at(BodyPart::RightEye)?);
        Some(l.midpoint(&r))
    });

    if let Some(center) = head_center {
        layout.head = Some(Circle {
            center,
            radius: config.head_radius,
        });

        let features = [
            (BodyPart::LeftEye, config.eye_radius),
            (BodyPart::RightEye, config.eye_radius),
            (BodyPart::LeftEar, config.ear_radius),
            (BodyPart::RightEar, config.ear_radius),
        ];
        for (part, radius) in features {
            if let Some(center) = at(part) {
                layout.dots.push(Circle { center, radius });
            }
        }
    }

    // Torso
    if let (Some(ls), Some(rs), Some(lh), Some(rh)) = (
        at(BodyPart::LeftShoulder),
        at(BodyPart::RightShoulder),
        at(BodyPart::LeftHip),
        at(BodyPart::RightHip),
    ) {
        layout.torso = Some([ls, rs, rh, lh]);

        let mid_shoulder = ls.midpoint(&rs);
        let mid_hip = lh.midpoint(&rh);
        layout.bones.push(Segment {
            from: mid_shoulder,
            to: mid_hip,
        });

        if let Some(head) = head_center {
            layout.bones.push(Segment {
                from: head.offset(0.0, config.head_radius),
                to: mid_shoulder,
            });
        }
    }

    for (a, b) in LIMBS {
        if let (Some(from), Some(to)) = (at(a), at(b)) {
            layout.bones.push(Segment { from, to });
        }
    }

    for part in JOINTS {
        if let Some(center) = at(part) {
            layout.dots.push(Circle {
                center,
                radius: config.joint_radius,
            });
        }
    }

    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Keypoint;

    fn full_pose(score: f32) -> Pose {
        let keypoints = BodyPart::all()
            .iter()
            .enumerate()
            .map(|(i, part)| Keypoint::new(*part, Position2D::new(i as f32 * 10.0, i as f32), score))
            .collect();
        Pose::new(score, keypoints)
    }

    #[test]
    fn test_full_pose_layout() {
        let layout = layout_skeleton(&full_pose(0.9), &SkeletonConfig::default());

        let head = layout.head.unwrap();
        assert_eq!(head.center, Position2D::new(0.0, 0.0));
        assert!(layout.torso.is_some());
        // spine + neck + 8 limb bones
        assert_eq!(layout.bones.len(), 10);
        // 4 facial dots + 12 joints
        assert_eq!(layout.dots.len(), 16);
    }

    #[test]
    fn test_invisible_pose_draws_nothing() {
        let layout = layout_skeleton(&full_pose(0.3), &SkeletonConfig::default());
        assert!(layout.is_empty());
    }

    #[test]
    fn test_head_falls_back_to_eye_midpoint() {
        let mut pose = full_pose(0.9);
        pose.keypoints[0].score = 0.0; // nose

        let layout = layout_skeleton(&pose, &SkeletonConfig::default());
        let head = layout.head.unwrap();
        // eyes at (10, 1) and (20, 2)
        assert_eq!(head.center, Position2D::new(15.0, 1.5));
    }

    #[test]
    fn test_neck_starts_below_head() {
        let layout = layout_skeleton(&full_pose(0.9), &SkeletonConfig::default());
        let neck = layout.bones[1];
        assert_eq!(neck.from, Position2D::new(0.0, 18.0));
    }
}
