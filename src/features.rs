//! Feature extraction: landmark geometry to a pose-corrected feature vector.
//!
//! Each frame reduces to six numbers: the normalized iris position inside
//! each eye box and the head yaw/pitch from the `PnP` solve. A confidence
//! score derived from the pose magnitude gates low-quality frames.

use crate::constants::{
    CONFIDENCE_ANGLE_RANGE_DEG, CONFIDENCE_SCALE, LEFT_EYE_BOTTOM, LEFT_EYE_INNER, LEFT_EYE_OUTER,
    LEFT_EYE_TOP, LEFT_IRIS_CENTER, MIN_EYE_EXTENT_PX, POSE_LANDMARK_IDS, RIGHT_EYE_BOTTOM,
    RIGHT_EYE_INNER, RIGHT_EYE_OUTER, RIGHT_EYE_TOP, RIGHT_IRIS_CENTER,
};
use crate::pose::{self, CameraIntrinsics, HeadPose};
use crate::types::{FeatureVector, LandmarkSet, Point2};
use nalgebra::Vector2;

/// Output of one extraction: the feature vector when a usable face was seen,
/// the frame confidence, and an echo of the raw landmarks for display layers.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub features: Option<FeatureVector>,
    pub confidence: f64,
    pub landmarks: Option<LandmarkSet>,
}

impl Extraction {
    fn empty() -> Self {
        Self::default()
    }
}

/// Stateless feature extractor apart from a cached intrinsics estimate,
/// recomputed only when the frame dimensions change.
#[derive(Debug, Default)]
pub struct FeatureExtractor {
    cached: Option<(u32, u32, CameraIntrinsics)>,
}

impl FeatureExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the feature vector and confidence from one frame's landmarks.
    ///
    /// Returns an empty extraction when no face was detected or the landmark
    /// set lacks the iris refinement points.
    pub fn extract(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        frame_width: u32,
        frame_height: u32,
    ) -> Extraction {
        let Some(set) = landmarks else {
            return Extraction::empty();
        };
        if !set.is_complete() {
            return Extraction::empty();
        }

        let px = |idx: usize| set.point_px(idx, frame_width, frame_height);

        let (left_x, left_y) = normalize_iris(
            px(LEFT_IRIS_CENTER),
            px(LEFT_EYE_OUTER),
            px(LEFT_EYE_INNER),
            px(LEFT_EYE_TOP),
            px(LEFT_EYE_BOTTOM),
        );
        let (right_x, right_y) = normalize_iris(
            px(RIGHT_IRIS_CENTER),
            px(RIGHT_EYE_INNER),
            px(RIGHT_EYE_OUTER),
            px(RIGHT_EYE_TOP),
            px(RIGHT_EYE_BOTTOM),
        );

        let intrinsics = self.intrinsics_for(frame_width, frame_height);
        let mut image_points = [Vector2::zeros(); 6];
        for (slot, idx) in image_points.iter_mut().zip(POSE_LANDMARK_IDS) {
            let p = px(idx);
            *slot = Vector2::new(p.x, p.y);
        }
        // Non-convergence degrades to a neutral pose rather than failing
        let HeadPose { yaw_deg, pitch_deg } =
            pose::solve_head_pose(&image_points, &intrinsics).unwrap_or_default();

        let penalty = (1.0 - (yaw_deg.abs() + pitch_deg.abs()) / CONFIDENCE_ANGLE_RANGE_DEG).max(0.0);
        let confidence = (CONFIDENCE_SCALE * penalty).clamp(0.0, 1.0);

        Extraction {
            features: Some(FeatureVector {
                left_iris_x: left_x,
                left_iris_y: left_y,
                right_iris_x: right_x,
                right_iris_y: right_y,
                yaw_deg,
                pitch_deg,
            }),
            confidence,
            landmarks: Some(set.clone()),
        }
    }

    fn intrinsics_for(&mut self, frame_width: u32, frame_height: u32) -> CameraIntrinsics {
        match self.cached {
            Some((w, h, k)) if w == frame_width && h == frame_height => k,
            _ => {
                let k = CameraIntrinsics::from_frame(frame_width, frame_height);
                self.cached = Some((frame_width, frame_height, k));
                k
            }
        }
    }
}

/// Normalize the iris centre into the eye bounding box.
///
/// Projects the iris onto the horizontal axis (from the left corner) and the
/// vertical axis (from the top lid), scaled by the squared axis lengths and
/// clamped to [0, 1]. Degenerate eyes (extent under one pixel) map to the
/// neutral (0.5, 0.5).
#[must_use]
pub fn normalize_iris(
    iris: Point2,
    eye_left: Point2,
    eye_right: Point2,
    eye_top: Point2,
    eye_bottom: Point2,
) -> (f64, f64) {
    let width = eye_right.distance(&eye_left);
    let height = eye_bottom.distance(&eye_top);
    if width < MIN_EYE_EXTENT_PX || height < MIN_EYE_EXTENT_PX {
        return (0.5, 0.5);
    }

    let horizontal = eye_right - eye_left;
    let vertical = eye_bottom - eye_top;
    let from_corner = iris - eye_left;
    let from_top = iris - eye_top;

    let norm_x = (from_corner.x * horizontal.x + from_corner.y * horizontal.y) / (width * width);
    let norm_y = (from_top.x * vertical.x + from_top.y * vertical.y) / (height * height);

    (norm_x.clamp(0.0, 1.0), norm_y.clamp(0.0, 1.0))
}
