//! Configuration management for the gaze tracking pipeline

use crate::constants::{
    DEFAULT_ANIMATE_SECS, DEFAULT_CALIBRATION_HZ, DEFAULT_COLLECT_SECS, DEFAULT_GP_MAX_SAMPLES,
    DEFAULT_GP_RESTARTS, DEFAULT_GRID_COLS, DEFAULT_GRID_MARGIN_FRAC, DEFAULT_GRID_ROWS,
    DEFAULT_LOW_CONFIDENCE, DEFAULT_MAX_FOLDS, DEFAULT_MIN_BUFFER, DEFAULT_MIN_CONFIDENCE,
    DEFAULT_MIN_RETAINED, DEFAULT_MIN_SAMPLES, DEFAULT_OUTLIER_Z, DEFAULT_RIDGE_ALPHA,
    DEFAULT_SETTLE_SECS, DEFAULT_SMOOTHING_ALPHA, DEFAULT_TRACKING_HZ, DEFAULT_TRANSITION_SECS,
    DEFAULT_WARN_ERROR_PCT,
};
use crate::regression::TrainingConfig;
use crate::session::{PhaseTiming, QualityGates};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Calibration target grid
    pub grid: GridConfig,

    /// Calibration phase timing
    pub timing: TimingConfig,

    /// Frame quality and aggregation gates
    pub quality: QualityConfig,

    /// Model training and selection
    pub training: ModelConfig,

    /// Live tracking behaviour
    pub tracking: TrackingConfig,
}

/// Calibration target grid parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of target columns (at least 2)
    pub cols: usize,

    /// Number of target rows (at least 2)
    pub rows: usize,

    /// Screen-edge margin as a fraction of each dimension
    pub margin_frac: f64,
}

/// Per-target phase durations and tick rates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Dot approach animation duration in seconds
    pub animate_secs: f64,

    /// Pause before capture starts, in seconds
    pub settle_secs: f64,

    /// Capture window per target, in seconds
    pub collect_secs: f64,

    /// Pause between targets, in seconds
    pub transition_secs: f64,

    /// Calibration loop rate in Hz
    pub calibration_hz: f64,

    /// Tracking loop rate in Hz
    pub tracking_hz: f64,
}

/// Frame quality gates applied while collecting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Minimum frame confidence accepted during collection (0.0-1.0)
    pub min_confidence: f64,

    /// Minimum buffered frames per target
    pub min_buffer: usize,

    /// Minimum frames surviving outlier filtering
    pub min_retained: usize,

    /// Robust z-score at which a frame counts as an outlier
    pub outlier_z: f64,
}

/// Regression training and model selection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Minimum retained calibration samples for training
    pub min_samples: usize,

    /// Ridge regularization strength
    pub ridge_alpha: f64,

    /// Maximum cross-validation folds
    pub max_folds: usize,

    /// Sample count above which the Gaussian process is skipped
    pub gp_max_samples: usize,

    /// Gaussian process hyperparameter restarts
    pub gp_restarts: usize,

    /// Seed for the restart sampler
    pub seed: u64,

    /// Mean error percentage above which results carry a warning
    pub warn_error_pct: f64,
}

/// Live tracking parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Smoothing weight for the newest gaze prediction (0.0-1.0]
    pub smoothing_alpha: f64,

    /// Confidence below which tracking reports low quality (0.0-1.0)
    pub low_confidence: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            timing: TimingConfig::default(),
            quality: QualityConfig::default(),
            training: ModelConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: DEFAULT_GRID_COLS,
            rows: DEFAULT_GRID_ROWS,
            margin_frac: DEFAULT_GRID_MARGIN_FRAC,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            animate_secs: DEFAULT_ANIMATE_SECS,
            settle_secs: DEFAULT_SETTLE_SECS,
            collect_secs: DEFAULT_COLLECT_SECS,
            transition_secs: DEFAULT_TRANSITION_SECS,
            calibration_hz: DEFAULT_CALIBRATION_HZ,
            tracking_hz: DEFAULT_TRACKING_HZ,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_buffer: DEFAULT_MIN_BUFFER,
            min_retained: DEFAULT_MIN_RETAINED,
            outlier_z: DEFAULT_OUTLIER_Z,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            ridge_alpha: DEFAULT_RIDGE_ALPHA,
            max_folds: DEFAULT_MAX_FOLDS,
            gp_max_samples: DEFAULT_GP_MAX_SAMPLES,
            gp_restarts: DEFAULT_GP_RESTARTS,
            seed: 0,
            warn_error_pct: DEFAULT_WARN_ERROR_PCT,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            low_confidence: DEFAULT_LOW_CONFIDENCE,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Phase timing view for the calibration session
    #[must_use]
    pub fn phase_timing(&self) -> PhaseTiming {
        PhaseTiming {
            animate_secs: self.timing.animate_secs,
            settle_secs: self.timing.settle_secs,
            collect_secs: self.timing.collect_secs,
            transition_secs: self.timing.transition_secs,
        }
    }

    /// Quality gate view for the calibration session
    #[must_use]
    pub fn quality_gates(&self) -> QualityGates {
        QualityGates {
            min_confidence: self.quality.min_confidence,
            min_buffer: self.quality.min_buffer,
            min_retained: self.quality.min_retained,
            outlier_z: self.quality.outlier_z,
        }
    }

    /// Training parameter view for the regression layer
    #[must_use]
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            min_samples: self.training.min_samples,
            ridge_alpha: self.training.ridge_alpha,
            max_folds: self.training.max_folds,
            gp_max_samples: self.training.gp_max_samples,
            gp_restarts: self.training.gp_restarts,
            seed: self.training.seed,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.grid.cols < 2 || self.grid.rows < 2 {
            return Err(Error::ConfigError(
                "Calibration grid must be at least 2x2".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.grid.margin_frac) {
            return Err(Error::ConfigError(
                "Grid margin fraction must be between 0.0 and 0.5".to_string(),
            ));
        }

        for (name, value) in [
            ("animate_secs", self.timing.animate_secs),
            ("settle_secs", self.timing.settle_secs),
            ("collect_secs", self.timing.collect_secs),
            ("transition_secs", self.timing.transition_secs),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(Error::ConfigError(format!(
                    "Phase duration {name} must be non-negative"
                )));
            }
        }
        if self.timing.calibration_hz <= 0.0 || self.timing.tracking_hz <= 0.0 {
            return Err(Error::ConfigError(
                "Tick rates must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.quality.min_confidence) {
            return Err(Error::ConfigError(
                "Minimum confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.quality.outlier_z <= 0.0 {
            return Err(Error::ConfigError(
                "Outlier z-score must be greater than 0".to_string(),
            ));
        }
        if self.quality.min_retained > self.quality.min_buffer {
            return Err(Error::ConfigError(
                "Minimum retained frames cannot exceed the minimum buffer size".to_string(),
            ));
        }

        if self.training.min_samples == 0 {
            return Err(Error::ConfigError(
                "Minimum sample count must be greater than 0".to_string(),
            ));
        }
        if self.training.ridge_alpha < 0.0 {
            return Err(Error::ConfigError(
                "Ridge alpha must be non-negative".to_string(),
            ));
        }
        if self.training.max_folds < 2 {
            return Err(Error::ConfigError(
                "Cross-validation needs at least 2 folds".to_string(),
            ));
        }
        if self.training.warn_error_pct <= 0.0 {
            return Err(Error::ConfigError(
                "Warning threshold must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.tracking.smoothing_alpha)
            || self.tracking.smoothing_alpha == 0.0
        {
            return Err(Error::ConfigError(
                "Smoothing alpha must be in (0.0, 1.0]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tracking.low_confidence) {
            return Err(Error::ConfigError(
                "Low-confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration in YAML format
pub const EXAMPLE_CONFIG: &str = r#"# Gaze Tracking Configuration

# Calibration target grid
grid:
  cols: 5
  rows: 4
  margin_frac: 0.05

# Calibration phase timing (seconds) and loop rates (Hz)
timing:
  animate_secs: 0.3
  settle_secs: 0.5
  collect_secs: 1.5
  transition_secs: 0.15
  calibration_hz: 60.0
  tracking_hz: 30.0

# Frame quality gates during collection
quality:
  min_confidence: 0.3
  min_buffer: 5
  min_retained: 3
  outlier_z: 2.0

# Model training and selection
training:
  min_samples: 10
  ridge_alpha: 1.0
  max_folds: 5
  gp_max_samples: 50
  gp_restarts: 2
  seed: 0
  warn_error_pct: 5.0

# Live tracking
tracking:
  smoothing_alpha: 0.35
  low_confidence: 0.4
"#;
