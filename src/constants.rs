//! Constants used throughout the gaze tracking pipeline

/// Full face-mesh landmark count including the iris refinement points.
/// A detection with fewer points carries no iris data and is discarded.
pub const FULL_LANDMARK_COUNT: usize = 478;

/// Left eye landmark indices (MediaPipe face mesh numbering)
pub const LEFT_EYE_INNER: usize = 133;
pub const LEFT_EYE_OUTER: usize = 33;
pub const LEFT_EYE_TOP: usize = 159;
pub const LEFT_EYE_BOTTOM: usize = 145;

/// Right eye landmark indices
pub const RIGHT_EYE_INNER: usize = 362;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const RIGHT_EYE_TOP: usize = 386;
pub const RIGHT_EYE_BOTTOM: usize = 374;

/// Iris centre landmarks from the iris refinement
pub const LEFT_IRIS_CENTER: usize = 468;
pub const RIGHT_IRIS_CENTER: usize = 473;

/// Landmark indices matched against [`POSE_MODEL_POINTS`] for the PnP solve
pub const POSE_LANDMARK_IDS: [usize; 6] = [1, 152, 33, 263, 61, 291];

/// Generic 3D face model points: nose tip, chin, left eye left corner,
/// right eye right corner, left mouth corner, right mouth corner.
pub const POSE_MODEL_POINTS: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, -330.0, -65.0],
    [-225.0, 170.0, -135.0],
    [225.0, 170.0, -135.0],
    [-150.0, -150.0, -125.0],
    [150.0, -150.0, -125.0],
];

/// Feature vector dimensionality
pub const FEATURE_DIMS: usize = 6;

/// Eye extent in pixels below which iris normalization is degenerate
pub const MIN_EYE_EXTENT_PX: f64 = 1.0;

/// Combined |yaw| + |pitch| in degrees at which pose confidence reaches zero
pub const CONFIDENCE_ANGLE_RANGE_DEG: f64 = 60.0;

/// Scale applied to the pose penalty when deriving confidence
pub const CONFIDENCE_SCALE: f64 = 0.9;

/// Epsilon added to per-dimension standard deviations during aggregation
pub const AGGREGATE_STD_EPSILON: f64 = 1e-8;

/// Default calibration grid shape
pub const DEFAULT_GRID_COLS: usize = 5;
pub const DEFAULT_GRID_ROWS: usize = 4;

/// Default screen-edge margin as a fraction of each screen dimension
pub const DEFAULT_GRID_MARGIN_FRAC: f64 = 0.05;

/// Default calibration phase durations in seconds
pub const DEFAULT_ANIMATE_SECS: f64 = 0.3;
pub const DEFAULT_SETTLE_SECS: f64 = 0.5;
pub const DEFAULT_COLLECT_SECS: f64 = 1.5;
pub const DEFAULT_TRANSITION_SECS: f64 = 0.15;

/// Default tick rates
pub const DEFAULT_CALIBRATION_HZ: f64 = 60.0;
pub const DEFAULT_TRACKING_HZ: f64 = 30.0;

/// Default frame quality gates
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;
pub const DEFAULT_OUTLIER_Z: f64 = 2.0;
pub const DEFAULT_MIN_BUFFER: usize = 5;
pub const DEFAULT_MIN_RETAINED: usize = 3;
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Mean error (percent of screen width) above which results carry a warning
pub const DEFAULT_WARN_ERROR_PCT: f64 = 5.0;

/// Default regression hyperparameters
pub const DEFAULT_RIDGE_ALPHA: f64 = 1.0;
pub const DEFAULT_MAX_FOLDS: usize = 5;
pub const DEFAULT_GP_MAX_SAMPLES: usize = 50;
pub const DEFAULT_GP_RESTARTS: usize = 2;

/// Default live tracking parameters
pub const DEFAULT_LOW_CONFIDENCE: f64 = 0.4;
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.35;

/// Sliding window length for FPS estimation
pub const FPS_WINDOW: usize = 30;

/// Milliseconds added to the detector timestamp per processed frame
pub const FRAME_TIMESTAMP_STEP_MS: u64 = 33;
