//! Live gaze tracking after calibration.
//!
//! Each tick pulls one frame through the pipeline, maps the features through
//! the calibrated model and smooths the result. The tracker also reports a
//! coarse status for display layers and a frame rate over a sliding window.

use std::collections::VecDeque;

use crate::constants::{DEFAULT_LOW_CONFIDENCE, DEFAULT_SMOOTHING_ALPHA, FPS_WINDOW};
use crate::error::Result;
use crate::features::Extraction;
use crate::pipeline::{FramePipeline, FrameSource, LandmarkProvider};
use crate::regression::GazeModel;
use crate::smoothing::GazeSmoother;
use crate::types::Point2;

/// Coarse tracking quality for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    /// No face detected in the frame
    FaceLost,
    /// Face present but the pose confidence is below the display threshold
    LowConfidence,
    Tracking,
}

/// Everything produced by one tracking tick
#[derive(Debug, Clone)]
pub struct TrackingUpdate {
    pub extraction: Extraction,
    pub status: TrackerStatus,
    /// Unsmoothed model prediction, when a model and features were available
    pub raw_gaze: Option<Point2>,
    /// Smoothed on-screen gaze position
    pub gaze: Option<Point2>,
    /// Frames per second over the recent tick window
    pub fps: f64,
}

/// Post-calibration tracking loop state
pub struct GazeTracker {
    model: Option<GazeModel>,
    smoother: GazeSmoother,
    low_confidence: f64,
    tick_times: VecDeque<f64>,
}

impl Default for GazeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_ALPHA, DEFAULT_LOW_CONFIDENCE)
    }
}

impl GazeTracker {
    /// # Panics
    ///
    /// Panics when `smoothing_alpha` is outside (0, 1].
    #[must_use]
    pub fn new(smoothing_alpha: f64, low_confidence: f64) -> Self {
        Self {
            model: None,
            smoother: GazeSmoother::new(smoothing_alpha),
            low_confidence,
            tick_times: VecDeque::with_capacity(FPS_WINDOW),
        }
    }

    /// Install a freshly calibrated model, dropping smoother history
    pub fn set_model(&mut self, model: GazeModel) {
        log::info!("tracking with {} model", model.family);
        self.model = Some(model);
        self.smoother.reset();
    }

    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Clear smoothing and frame-rate history, keeping the model
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.tick_times.clear();
    }

    /// Process one frame at time `now` (seconds).
    ///
    /// Returns `Ok(None)` when the pipeline's source is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates pipeline failures.
    pub fn tick<S: FrameSource, P: LandmarkProvider>(
        &mut self,
        pipeline: &mut FramePipeline<S, P>,
        now: f64,
    ) -> Result<Option<TrackingUpdate>> {
        let Some(extraction) = pipeline.process()? else {
            return Ok(None);
        };

        if self.tick_times.len() == FPS_WINDOW {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(now);
        let fps = match (self.tick_times.front(), self.tick_times.back()) {
            (Some(first), Some(last)) if last > first => {
                (self.tick_times.len() - 1) as f64 / (last - first)
            }
            _ => 0.0,
        };

        // Status is a display-only classification; prediction runs whenever
        // a model and features exist, even on low-confidence frames.
        let status = if extraction.features.is_none() {
            self.smoother.reset();
            TrackerStatus::FaceLost
        } else if extraction.confidence < self.low_confidence {
            TrackerStatus::LowConfidence
        } else {
            TrackerStatus::Tracking
        };

        let raw_gaze = match (&self.model, extraction.features) {
            (Some(model), Some(features)) => Some(model.predict(&features)),
            _ => None,
        };
        let gaze = raw_gaze.map(|raw| self.smoother.apply(raw));

        Ok(Some(TrackingUpdate {
            extraction,
            status,
            raw_gaze,
            gaze,
            fps,
        }))
    }
}
