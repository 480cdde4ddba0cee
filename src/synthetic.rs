//! Synthetic faces, frame sources and landmark providers.
//!
//! These stand in for a camera and a face-mesh backend in tests, benches and
//! the demo binary. The generated landmarks are geometrically consistent:
//! the pose reference points are true pinhole projections of the 3D face
//! model under a gaze-dependent rotation, and the eye boxes are anchored to
//! the projected eye corners, so the extractor recovers the intended iris
//! position and head pose exactly.

use crate::constants::{
    LEFT_EYE_BOTTOM, LEFT_EYE_INNER, LEFT_EYE_OUTER, LEFT_EYE_TOP, LEFT_IRIS_CENTER,
    FULL_LANDMARK_COUNT, POSE_LANDMARK_IDS, POSE_MODEL_POINTS, RIGHT_EYE_BOTTOM, RIGHT_EYE_INNER,
    RIGHT_EYE_OUTER, RIGHT_EYE_TOP, RIGHT_IRIS_CENTER,
};
use crate::error::Result;
use crate::pipeline::{FrameSource, LandmarkProvider};
use crate::types::{Frame, LandmarkSet, Point2};
use nalgebra::{Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Head rotation in radians per unit of normalized gaze offset from centre
const GAZE_ROTATION_GAIN: f64 = 0.3;
/// Camera-frame depth of the synthetic head in model units
const HEAD_DEPTH: f64 = 1500.0;
/// Eye box extents in pixels
const EYE_WIDTH_PX: f64 = 40.0;
const EYE_HEIGHT_PX: f64 = 16.0;

/// A parametric face whose landmarks depend deterministically on where on
/// the screen it is looking.
#[derive(Debug, Clone)]
pub struct SyntheticFace {
    screen_width: f64,
    screen_height: f64,
    frame_width: u32,
    frame_height: u32,
}

impl SyntheticFace {
    #[must_use]
    pub fn new(screen_width: f64, screen_height: f64, frame_width: u32, frame_height: u32) -> Self {
        Self {
            screen_width,
            screen_height,
            frame_width,
            frame_height,
        }
    }

    fn project(&self, rotation: &Rotation3<f64>, model: [f64; 3]) -> Point2 {
        let cam = rotation * Vector3::new(model[0], model[1], model[2])
            + Vector3::new(0.0, 0.0, HEAD_DEPTH);
        let focal = f64::from(self.frame_width);
        Point2::new(
            focal * cam.x / cam.z + f64::from(self.frame_width) / 2.0,
            focal * cam.y / cam.z + f64::from(self.frame_height) / 2.0,
        )
    }

    fn normalized(&self, px: Point2) -> Point2 {
        Point2::new(
            px.x / f64::from(self.frame_width),
            px.y / f64::from(self.frame_height),
        )
    }

    /// Landmarks for a face looking at `gaze` in screen pixels.
    #[must_use]
    pub fn landmarks_for_gaze(&self, gaze: Point2) -> LandmarkSet {
        let nx = (gaze.x / self.screen_width).clamp(0.0, 1.0);
        let ny = (gaze.y / self.screen_height).clamp(0.0, 1.0);

        // The head turns slightly with the gaze; the iris carries the rest.
        let rotation = Rotation3::from_scaled_axis(Vector3::new(
            (ny - 0.5) * GAZE_ROTATION_GAIN,
            (nx - 0.5) * GAZE_ROTATION_GAIN,
            0.0,
        ));

        let mut points = vec![Point2::new(0.5, 0.5); FULL_LANDMARK_COUNT];
        for (idx, model) in POSE_LANDMARK_IDS.iter().zip(POSE_MODEL_POINTS) {
            points[*idx] = self.normalized(self.project(&rotation, model));
        }

        // Left eye box hangs off the projected outer corner (landmark 33,
        // already placed above); the inner corner sits one box-width inward.
        let left_outer = self.project(&rotation, POSE_MODEL_POINTS[2]);
        points[LEFT_EYE_INNER] =
            self.normalized(Point2::new(left_outer.x + EYE_WIDTH_PX, left_outer.y));
        self.place_eye(
            &mut points,
            left_outer,
            nx,
            ny,
            [LEFT_EYE_TOP, LEFT_EYE_BOTTOM, LEFT_IRIS_CENTER],
        );

        // Right eye box ends at the projected outer corner (landmark 263);
        // the inner corner one box-width before it is the box origin the
        // normalizer measures from.
        let right_outer = self.project(&rotation, POSE_MODEL_POINTS[3]);
        let right_inner = Point2::new(right_outer.x - EYE_WIDTH_PX, right_outer.y);
        points[RIGHT_EYE_INNER] = self.normalized(right_inner);
        self.place_eye(
            &mut points,
            right_inner,
            nx,
            ny,
            [RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM, RIGHT_IRIS_CENTER],
        );

        LandmarkSet::new(points)
    }

    /// Landmarks with uniform pixel noise on the eye points, for exercising
    /// the outlier and aggregation paths.
    pub fn landmarks_jittered(&self, gaze: Point2, jitter_px: f64, rng: &mut StdRng) -> LandmarkSet {
        let mut set = self.landmarks_for_gaze(gaze);
        let indices = [
            LEFT_EYE_INNER,
            LEFT_EYE_OUTER,
            LEFT_EYE_TOP,
            LEFT_EYE_BOTTOM,
            LEFT_IRIS_CENTER,
            RIGHT_EYE_INNER,
            RIGHT_EYE_OUTER,
            RIGHT_EYE_TOP,
            RIGHT_EYE_BOTTOM,
            RIGHT_IRIS_CENTER,
        ];
        for idx in indices {
            let p = set.points[idx];
            set.points[idx] = Point2::new(
                p.x + rng.gen_range(-jitter_px..=jitter_px) / f64::from(self.frame_width),
                p.y + rng.gen_range(-jitter_px..=jitter_px) / f64::from(self.frame_height),
            );
        }
        set
    }

    /// Fill one eye's lids and iris. `origin` is the box corner the
    /// normalizer measures from; `indices` are [top, bottom, iris].
    fn place_eye(
        &self,
        points: &mut [Point2],
        origin: Point2,
        nx: f64,
        ny: f64,
        indices: [usize; 3],
    ) {
        let [top, bottom, iris] = indices;
        points[top] = self.normalized(Point2::new(
            origin.x + EYE_WIDTH_PX / 2.0,
            origin.y - EYE_HEIGHT_PX / 2.0,
        ));
        points[bottom] = self.normalized(Point2::new(
            origin.x + EYE_WIDTH_PX / 2.0,
            origin.y + EYE_HEIGHT_PX / 2.0,
        ));
        points[iris] = self.normalized(Point2::new(
            origin.x + nx * EYE_WIDTH_PX,
            origin.y - EYE_HEIGHT_PX / 2.0 + ny * EYE_HEIGHT_PX,
        ));
    }
}

/// An endless source of blank frames of a fixed size
#[derive(Debug, Clone)]
pub struct SyntheticFrameSource {
    width: u32,
    height: u32,
}

impl SyntheticFrameSource {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameSource for SyntheticFrameSource {
    fn read_frame(&mut self) -> Result<Option<Frame>> {
        Ok(Some(Frame::new(self.width, self.height, Vec::new())))
    }
}

/// A landmark provider backed by a [`SyntheticFace`].
///
/// The gaze target and face presence can be changed between frames; optional
/// jitter makes consecutive detections noisy like a real backend.
pub struct SyntheticProvider {
    face: SyntheticFace,
    gaze: Point2,
    present: bool,
    jitter_px: f64,
    rng: StdRng,
}

impl SyntheticProvider {
    #[must_use]
    pub fn new(screen_width: f64, screen_height: f64, frame_width: u32, frame_height: u32) -> Self {
        Self {
            face: SyntheticFace::new(screen_width, screen_height, frame_width, frame_height),
            gaze: Point2::new(screen_width / 2.0, screen_height / 2.0),
            present: true,
            jitter_px: 0.0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter_px: f64, seed: u64) -> Self {
        self.jitter_px = jitter_px;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn set_gaze(&mut self, gaze: Point2) {
        self.gaze = gaze;
    }

    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }
}

impl LandmarkProvider for SyntheticProvider {
    fn detect(&mut self, _frame: &Frame, _timestamp_ms: u64) -> Result<Option<LandmarkSet>> {
        if !self.present {
            return Ok(None);
        }
        let set = if self.jitter_px > 0.0 {
            self.face
                .landmarks_jittered(self.gaze, self.jitter_px, &mut self.rng)
        } else {
            self.face.landmarks_for_gaze(self.gaze)
        };
        Ok(Some(set))
    }
}
