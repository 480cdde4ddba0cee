//! Gaze tracking library: from face landmarks to on-screen gaze positions.
//!
//! The pipeline turns per-frame face-mesh landmarks into a six-dimensional
//! feature vector (normalized iris positions plus head yaw and pitch), runs
//! a timed calibration session over a grid of screen targets, trains a
//! regression model by cross-validated selection between a polynomial ridge
//! and a Gaussian process, and then maps live features to smoothed screen
//! coordinates.
//!
//! Cameras and landmark inference stay outside the crate: callers implement
//! [`pipeline::FrameSource`] and [`pipeline::LandmarkProvider`] for their
//! backend of choice. The [`synthetic`] module ships deterministic
//! implementations used by the tests and the demo binary.
//!
//! # Examples
//!
//! ```
//! use gaze_tracking::pipeline::FramePipeline;
//! use gaze_tracking::session::{CalibrationOutcome, CalibrationSession, Phase};
//! use gaze_tracking::synthetic::{SyntheticFrameSource, SyntheticProvider};
//! use gaze_tracking::types::ScreenGeometry;
//!
//! # fn main() -> gaze_tracking::Result<()> {
//! let screen = ScreenGeometry::new(1440.0, 900.0);
//! let source = SyntheticFrameSource::new(640, 480);
//! let provider = SyntheticProvider::new(1440.0, 900.0, 640, 480);
//! let mut pipeline = FramePipeline::new(source, provider);
//!
//! let mut session = CalibrationSession::with_defaults(screen, 5, 4)?;
//! session.begin(0.0);
//!
//! let mut now = 0.0;
//! while session.phase() != Phase::Complete {
//!     now += 1.0 / 60.0;
//!     let snapshot = session.snapshot(now);
//!     pipeline.provider_mut().set_gaze(snapshot.target);
//!     let frame = if session.needs_frame() {
//!         pipeline.process()?
//!     } else {
//!         None
//!     };
//!     session.tick(now, frame.as_ref());
//! }
//!
//! match session.outcome() {
//!     Some(CalibrationOutcome::Success { mean_error_px, .. }) => {
//!         println!("calibrated, mean error {mean_error_px:.1}px");
//!     }
//!     _ => println!("calibration failed"),
//! }
//! # Ok(())
//! # }
//! ```

/// Outlier-robust aggregation of collected feature vectors
pub mod aggregate;

/// Configuration loading and validation
pub mod config;

/// Shared constants (landmark indices, thresholds, defaults)
pub mod constants;

/// Error types
pub mod error;

/// Feature extraction from landmarks
pub mod features;

/// Frame source and landmark provider traits plus the pipeline glue
pub mod pipeline;

/// Head pose estimation via `PnP`
pub mod pose;

/// Regression models and cross-validated selection
pub mod regression;

/// Calibration session state machine
pub mod session;

/// Exponential gaze smoothing
pub mod smoothing;

/// Synthetic faces, sources and providers for tests and demos
pub mod synthetic;

/// Live tracking loop state
pub mod tracker;

/// Core data types
pub mod types;

pub use error::{Error, Result};
