//! Core data types shared across the gaze tracking pipeline.

use crate::constants::{FEATURE_DIMS, FULL_LANDMARK_COUNT};

/// A 2D point in pixel or normalized coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl std::ops::Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// One video frame handed to the landmark provider.
///
/// The pixel buffer is opaque to this crate; only the dimensions are used by
/// the numeric pipeline.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }
}

/// Ordered face landmarks in normalized image coordinates.
///
/// Indexing follows the MediaPipe face-mesh convention; specific indices
/// denote eye corners, iris centres and the pose reference points (see
/// [`crate::constants`]).
#[derive(Debug, Clone, Default)]
pub struct LandmarkSet {
    pub points: Vec<Point2>,
}

impl LandmarkSet {
    #[must_use]
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Whether the set carries the full iris-inclusive point count
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.len() >= FULL_LANDMARK_COUNT
    }

    /// Landmark position in pixel coordinates for the given frame size
    #[must_use]
    pub fn point_px(&self, idx: usize, frame_width: u32, frame_height: u32) -> Point2 {
        let p = self.points[idx];
        Point2::new(p.x * f64::from(frame_width), p.y * f64::from(frame_height))
    }
}

/// The 6-dimensional gaze feature vector derived from one frame.
///
/// Iris components are normalized eye-box positions in [0, 1]; the angles are
/// signed degrees from the head pose solve. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub left_iris_x: f64,
    pub left_iris_y: f64,
    pub right_iris_x: f64,
    pub right_iris_y: f64,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
}

impl FeatureVector {
    /// Number of components
    pub const DIMS: usize = FEATURE_DIMS;

    #[must_use]
    pub fn as_array(&self) -> [f64; FEATURE_DIMS] {
        [
            self.left_iris_x,
            self.left_iris_y,
            self.right_iris_x,
            self.right_iris_y,
            self.yaw_deg,
            self.pitch_deg,
        ]
    }

    #[must_use]
    pub fn from_array(values: [f64; FEATURE_DIMS]) -> Self {
        Self {
            left_iris_x: values[0],
            left_iris_y: values[1],
            right_iris_x: values[2],
            right_iris_y: values[3],
            yaw_deg: values[4],
            pitch_deg: values[5],
        }
    }
}

/// One retained calibration observation: the aggregated feature vector for a
/// target together with the target's screen position.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationSample {
    pub features: FeatureVector,
    pub target: Point2,
}

/// Screen dimensions in pixels, used for target-grid generation and
/// percentage-error normalization.
#[derive(Debug, Clone, Copy)]
pub struct ScreenGeometry {
    pub width: f64,
    pub height: f64,
}

impl ScreenGeometry {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_feature_vector_round_trip() {
        let f = FeatureVector::from_array([0.1, 0.2, 0.3, 0.4, -5.0, 7.5]);
        assert_eq!(f.as_array(), [0.1, 0.2, 0.3, 0.4, -5.0, 7.5]);
        assert_eq!(f.yaw_deg, -5.0);
        assert_eq!(f.pitch_deg, 7.5);
    }

    #[test]
    fn test_landmark_set_completeness() {
        let short = LandmarkSet::new(vec![Point2::default(); 100]);
        assert!(!short.is_complete());

        let full = LandmarkSet::new(vec![Point2::default(); 478]);
        assert!(full.is_complete());
    }

    #[test]
    fn test_point_px_scaling() {
        let set = LandmarkSet::new(vec![Point2::new(0.5, 0.25)]);
        let p = set.point_px(0, 640, 480);
        assert_eq!(p, Point2::new(320.0, 120.0));
    }
}
