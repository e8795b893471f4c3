//! Landmark adapter
//!
//! Maps a pose estimator's fixed-index keypoint list onto the eight joint
//! angles the engine consumes. Only the body keypoints from index 11 onward
//! are used; face keypoints are ignored.

use crate::angles::{AngleSet, Joint};
use crate::config::LandmarkConfig;
use crate::error::{FormCoachError, Result};
use crate::geometry::{try_angle_at, Point2D};
use tracing::{debug, trace};

/// Body keypoint indices in the estimator's 33-point schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
}

impl KeypointIndex {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Keypoints 0..=28 must be present to reach both ankles
pub const REQUIRED_LANDMARKS: usize = KeypointIndex::RightAnkle as usize + 1;

/// Converts raw keypoints into an [`AngleSet`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkAdapter {
    scale_x: f32,
    scale_y: f32,
}

impl LandmarkAdapter {
    pub fn new(config: &LandmarkConfig) -> Self {
        Self {
            scale_x: config.scale_x,
            scale_y: config.scale_y,
        }
    }

    /// Adapter that uses keypoints as given
    pub fn unscaled() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Compute the eight joint angles for one frame
    ///
    /// Fails with [`FormCoachError::InsufficientLandmarks`] when the frame does
    /// not carry every keypoint up to the right ankle; the caller should skip
    /// the frame.
    pub fn compute_angles(&self, landmarks: &[Point2D]) -> Result<AngleSet> {
        if landmarks.len() < REQUIRED_LANDMARKS {
            return Err(FormCoachError::InsufficientLandmarks {
                found: landmarks.len(),
                required: REQUIRED_LANDMARKS,
            });
        }

        let point = |k: KeypointIndex| landmarks[k.index()].scaled(self.scale_x, self.scale_y);

        let angles = AngleSet::from_fn(|joint| {
            let (a, vertex, b) = joint_keypoints(joint);
            try_angle_at(point(a), point(vertex), point(b))
        });

        let undetermined: Vec<Joint> = angles.undetermined().collect();
        if !undetermined.is_empty() {
            debug!("Undetermined joint angles this frame: {:?}", undetermined);
        }
        trace!("Computed joint angles: {:?}", angles);

        Ok(angles)
    }
}

/// Keypoints forming the angle at `joint`, vertex in the middle
fn joint_keypoints(joint: Joint) -> (KeypointIndex, KeypointIndex, KeypointIndex) {
    use KeypointIndex as K;
    match joint {
        Joint::LeftElbow => (K::LeftShoulder, K::LeftElbow, K::LeftWrist),
        Joint::RightElbow => (K::RightShoulder, K::RightElbow, K::RightWrist),
        Joint::LeftKnee => (K::LeftHip, K::LeftKnee, K::LeftAnkle),
        Joint::RightKnee => (K::RightHip, K::RightKnee, K::RightAnkle),
        Joint::LeftShoulder => (K::LeftElbow, K::LeftShoulder, K::LeftHip),
        Joint::RightShoulder => (K::RightElbow, K::RightShoulder, K::RightHip),
        Joint::LeftHip => (K::LeftShoulder, K::LeftHip, K::LeftKnee),
        Joint::RightHip => (K::RightShoulder, K::RightHip, K::RightKnee),
    }
}

impl Default for LandmarkAdapter {
    fn default() -> Self {
        Self::unscaled()
    }
}
