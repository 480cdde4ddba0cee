//! Calibration session: target sequencing, timed phases and sample capture.
//!
//! The session walks a grid of on-screen targets. Each target runs through a
//! fixed phase sequence (animate in, settle, collect, transition out) driven
//! by an external clock passed into [`CalibrationSession::tick`], so the
//! machine itself never reads a timer. Frames are only consumed during the
//! collect phase and only when their confidence clears the quality gate.

use crate::aggregate::aggregate;
use crate::error::{Error, Result};
use crate::features::Extraction;
use crate::regression::{self, GazeModel, TrainingConfig};
use crate::types::{CalibrationSample, FeatureVector, Point2, ScreenGeometry};

/// Phase timing for one calibration target, in seconds
#[derive(Debug, Clone, Copy)]
pub struct PhaseTiming {
    pub animate_secs: f64,
    pub settle_secs: f64,
    pub collect_secs: f64,
    pub transition_secs: f64,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        use crate::constants::{
            DEFAULT_ANIMATE_SECS, DEFAULT_COLLECT_SECS, DEFAULT_SETTLE_SECS,
            DEFAULT_TRANSITION_SECS,
        };
        Self {
            animate_secs: DEFAULT_ANIMATE_SECS,
            settle_secs: DEFAULT_SETTLE_SECS,
            collect_secs: DEFAULT_COLLECT_SECS,
            transition_secs: DEFAULT_TRANSITION_SECS,
        }
    }
}

/// Frame-quality and aggregation gates applied while collecting
#[derive(Debug, Clone, Copy)]
pub struct QualityGates {
    pub min_confidence: f64,
    pub min_buffer: usize,
    pub min_retained: usize,
    pub outlier_z: f64,
}

impl Default for QualityGates {
    fn default() -> Self {
        use crate::constants::{
            DEFAULT_MIN_BUFFER, DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_RETAINED, DEFAULT_OUTLIER_Z,
        };
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_buffer: DEFAULT_MIN_BUFFER,
            min_retained: DEFAULT_MIN_RETAINED,
            outlier_z: DEFAULT_OUTLIER_Z,
        }
    }
}

/// Session phase visible to display layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the user to start
    Instructions,
    /// The dot is moving towards the current target
    Animating,
    /// The dot is parked, letting the eyes land before capture
    Settling,
    /// Frames are being captured for the current target
    Collecting,
    /// Short pause before the next target
    Transitioning,
    /// All targets done, outcome available
    Complete,
    /// Aborted by the user
    Cancelled,
}

/// Prediction residual for one retained calibration sample
#[derive(Debug, Clone, Copy)]
pub struct TargetResidual {
    pub target: Point2,
    pub predicted: Point2,
    pub error_px: f64,
}

/// Terminal result of a calibration run
#[derive(Debug, Clone)]
pub enum CalibrationOutcome {
    Success {
        model: GazeModel,
        mean_error_px: f64,
        /// Mean error as a percentage of the screen width
        mean_error_pct: f64,
        /// Set when the mean error percentage exceeds the warning threshold
        warning: bool,
        per_target: Vec<TargetResidual>,
        cv_error: f64,
        in_sample_mae: (f64, f64),
    },
    Failure {
        reason: String,
        retained: usize,
    },
}

/// What a display layer needs to draw the current session state
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub target_index: usize,
    pub target_count: usize,
    pub target: Point2,
    /// Dot position including the ease-out approach animation
    pub dot: Point2,
    /// Collect-phase progress in [0, 1], zero outside collection
    pub collect_progress: f64,
}

/// Generate the calibration target grid in row-major order.
///
/// Targets are laid out `cols` by `rows` inside a margin of `margin_frac`
/// times each screen dimension.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when either grid dimension is below two
/// or the margin fraction does not leave a positive interior.
pub fn generate_targets(
    screen: ScreenGeometry,
    cols: usize,
    rows: usize,
    margin_frac: f64,
) -> Result<Vec<Point2>> {
    if cols < 2 || rows < 2 {
        return Err(Error::InvalidInput(format!(
            "calibration grid must be at least 2x2, got {cols}x{rows}"
        )));
    }
    if !(0.0..0.5).contains(&margin_frac) {
        return Err(Error::InvalidInput(format!(
            "margin fraction must be in [0, 0.5), got {margin_frac}"
        )));
    }

    let mx = screen.width * margin_frac;
    let my = screen.height * margin_frac;
    let step_x = (screen.width - 2.0 * mx) / (cols - 1) as f64;
    let step_y = (screen.height - 2.0 * my) / (rows - 1) as f64;

    let mut targets = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            targets.push(Point2::new(
                mx + c as f64 * step_x,
                my + r as f64 * step_y,
            ));
        }
    }
    Ok(targets)
}

fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// The calibration state machine
#[derive(Debug)]
pub struct CalibrationSession {
    targets: Vec<Point2>,
    screen: ScreenGeometry,
    timing: PhaseTiming,
    gates: QualityGates,
    training: TrainingConfig,
    warn_error_pct: f64,

    phase: Phase,
    current: usize,
    phase_start: f64,
    buffer: Vec<FeatureVector>,
    samples: Vec<CalibrationSample>,
    skipped: usize,
    outcome: Option<CalibrationOutcome>,
}

impl CalibrationSession {
    /// Build a session over a freshly generated target grid.
    ///
    /// # Errors
    ///
    /// Propagates grid validation errors from [`generate_targets`].
    pub fn new(
        screen: ScreenGeometry,
        cols: usize,
        rows: usize,
        margin_frac: f64,
        timing: PhaseTiming,
        gates: QualityGates,
        training: TrainingConfig,
        warn_error_pct: f64,
    ) -> Result<Self> {
        let targets = generate_targets(screen, cols, rows, margin_frac)?;
        Ok(Self {
            targets,
            screen,
            timing,
            gates,
            training,
            warn_error_pct,
            phase: Phase::Instructions,
            current: 0,
            phase_start: 0.0,
            buffer: Vec::new(),
            samples: Vec::new(),
            skipped: 0,
            outcome: None,
        })
    }

    /// Session with all default parameters for the given screen and grid
    pub fn with_defaults(screen: ScreenGeometry, cols: usize, rows: usize) -> Result<Self> {
        Self::new(
            screen,
            cols,
            rows,
            crate::constants::DEFAULT_GRID_MARGIN_FRAC,
            PhaseTiming::default(),
            QualityGates::default(),
            TrainingConfig::default(),
            crate::constants::DEFAULT_WARN_ERROR_PCT,
        )
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Whether the session wants a frame on the next tick. Frames outside
    /// the collect phase are ignored, so callers may skip extraction.
    #[must_use]
    pub fn needs_frame(&self) -> bool {
        self.phase == Phase::Collecting
    }

    /// Leave the instructions screen and start the first target
    pub fn begin(&mut self, now: f64) {
        if self.phase == Phase::Instructions {
            log::info!("calibration started: {} targets", self.targets.len());
            self.enter(Phase::Animating, now);
        }
    }

    /// Abort the session; the outcome stays unset
    pub fn cancel(&mut self) {
        if !matches!(self.phase, Phase::Complete | Phase::Cancelled) {
            log::info!(
                "calibration cancelled at target {}/{}",
                self.current + 1,
                self.targets.len()
            );
            self.phase = Phase::Cancelled;
            self.buffer.clear();
        }
    }

    /// Advance the state machine to `now`, consuming at most one frame.
    pub fn tick(&mut self, now: f64, frame: Option<&Extraction>) {
        let elapsed = now - self.phase_start;
        match self.phase {
            Phase::Instructions | Phase::Complete | Phase::Cancelled => {}
            Phase::Animating => {
                if elapsed >= self.timing.animate_secs {
                    self.enter(Phase::Settling, now);
                }
            }
            Phase::Settling => {
                if elapsed >= self.timing.settle_secs {
                    self.enter(Phase::Collecting, now);
                }
            }
            Phase::Collecting => {
                if elapsed >= self.timing.collect_secs {
                    self.finish_target();
                    self.enter(Phase::Transitioning, now);
                } else if let Some(extraction) = frame {
                    if let Some(features) = extraction.features {
                        if extraction.confidence > self.gates.min_confidence {
                            self.buffer.push(features);
                        }
                    }
                }
            }
            Phase::Transitioning => {
                if elapsed >= self.timing.transition_secs {
                    if self.current + 1 < self.targets.len() {
                        self.current += 1;
                        self.enter(Phase::Animating, now);
                    } else {
                        self.finish_session();
                    }
                }
            }
        }
    }

    /// Current display state. `now` drives the approach animation.
    #[must_use]
    pub fn snapshot(&self, now: f64) -> SessionSnapshot {
        let target = self.targets[self.current];
        let dot = if self.phase == Phase::Animating {
            let from = if self.current == 0 {
                Point2::new(self.screen.width / 2.0, self.screen.height / 2.0)
            } else {
                self.targets[self.current - 1]
            };
            let t = ease_out_cubic((now - self.phase_start) / self.timing.animate_secs);
            Point2::new(
                from.x + (target.x - from.x) * t,
                from.y + (target.y - from.y) * t,
            )
        } else {
            target
        };
        let collect_progress = if self.phase == Phase::Collecting {
            ((now - self.phase_start) / self.timing.collect_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        SessionSnapshot {
            phase: self.phase,
            target_index: self.current,
            target_count: self.targets.len(),
            target,
            dot,
            collect_progress,
        }
    }

    /// Terminal outcome, present once the phase is [`Phase::Complete`]
    #[must_use]
    pub fn outcome(&self) -> Option<&CalibrationOutcome> {
        self.outcome.as_ref()
    }

    fn enter(&mut self, phase: Phase, now: f64) {
        self.phase = phase;
        self.phase_start = now;
    }

    fn finish_target(&mut self) {
        let aggregated = aggregate(
            &self.buffer,
            self.gates.min_buffer,
            self.gates.min_retained,
            self.gates.outlier_z,
        );
        match aggregated {
            Some(features) => {
                self.samples.push(CalibrationSample {
                    features,
                    target: self.targets[self.current],
                });
                log::debug!(
                    "target {}/{} captured from {} frames",
                    self.current + 1,
                    self.targets.len(),
                    self.buffer.len()
                );
            }
            None => {
                self.skipped += 1;
                log::warn!(
                    "target {}/{} skipped: {} usable frames",
                    self.current + 1,
                    self.targets.len(),
                    self.buffer.len()
                );
            }
        }
        self.buffer.clear();
    }

    fn finish_session(&mut self) {
        self.phase = Phase::Complete;
        let outcome = match regression::train(&self.samples, &self.training) {
            Ok(report) => {
                let per_target: Vec<TargetResidual> = self
                    .samples
                    .iter()
                    .map(|s| {
                        let predicted = report.model.predict(&s.features);
                        TargetResidual {
                            target: s.target,
                            predicted,
                            error_px: predicted.distance(&s.target),
                        }
                    })
                    .collect();
                let mean_error_px = per_target.iter().map(|r| r.error_px).sum::<f64>()
                    / per_target.len() as f64;
                let mean_error_pct = mean_error_px / self.screen.width * 100.0;
                let warning = mean_error_pct > self.warn_error_pct;
                if warning {
                    log::warn!(
                        "calibration accuracy is poor: mean error {mean_error_pct:.1}% of screen width"
                    );
                } else {
                    log::info!(
                        "calibration finished: {} mapped, mean error {mean_error_px:.1}px",
                        report.model.family
                    );
                }
                CalibrationOutcome::Success {
                    model: report.model,
                    mean_error_px,
                    mean_error_pct,
                    warning,
                    per_target,
                    cv_error: report.cv_error,
                    in_sample_mae: report.in_sample_mae,
                }
            }
            Err(e) => {
                log::warn!(
                    "calibration failed: {e} ({} targets skipped)",
                    self.skipped
                );
                CalibrationOutcome::Failure {
                    reason: e.to_string(),
                    retained: self.samples.len(),
                }
            }
        };
        self.outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> ScreenGeometry {
        ScreenGeometry::new(1000.0, 800.0)
    }

    #[test]
    fn test_grid_layout_and_margins() {
        let targets = generate_targets(screen(), 5, 4, 0.05).unwrap();
        assert_eq!(targets.len(), 20);
        assert_eq!(targets[0], Point2::new(50.0, 40.0));
        assert_eq!(targets[4], Point2::new(950.0, 40.0));
        assert_eq!(targets[19], Point2::new(950.0, 760.0));
        // Row-major: second row starts below the first
        assert_eq!(targets[5].x, 50.0);
        assert!(targets[5].y > targets[0].y);
    }

    #[test]
    fn test_grid_rejects_degenerate_shapes() {
        assert!(generate_targets(screen(), 1, 4, 0.05).is_err());
        assert!(generate_targets(screen(), 5, 1, 0.05).is_err());
        assert!(generate_targets(screen(), 5, 4, 0.5).is_err());
        assert!(generate_targets(screen(), 5, 4, -0.1).is_err());
    }

    #[test]
    fn test_phase_sequence_for_one_target() {
        let mut session = CalibrationSession::with_defaults(screen(), 2, 2).unwrap();
        assert_eq!(session.phase(), Phase::Instructions);
        session.tick(0.0, None);
        assert_eq!(session.phase(), Phase::Instructions);

        session.begin(0.0);
        assert_eq!(session.phase(), Phase::Animating);
        assert!(!session.needs_frame());

        session.tick(0.1, None);
        assert_eq!(session.phase(), Phase::Animating);
        session.tick(0.3, None);
        assert_eq!(session.phase(), Phase::Settling);
        session.tick(0.8, None);
        assert_eq!(session.phase(), Phase::Collecting);
        assert!(session.needs_frame());
        session.tick(2.3, None);
        assert_eq!(session.phase(), Phase::Transitioning);
        session.tick(2.45, None);
        // Second target of four starts animating
        assert_eq!(session.phase(), Phase::Animating);
        assert_eq!(session.snapshot(2.45).target_index, 1);
    }

    #[test]
    fn test_dot_animates_towards_target() {
        let mut session = CalibrationSession::with_defaults(screen(), 2, 2).unwrap();
        session.begin(0.0);
        let start = session.snapshot(0.0).dot;
        assert_eq!(start, Point2::new(500.0, 400.0)); // screen centre

        let mid = session.snapshot(0.15).dot;
        let target = session.snapshot(0.0).target;
        assert!(mid.distance(&target) < start.distance(&target));

        let done = session.snapshot(0.3).dot;
        assert!(done.distance(&target) < 1e-9);
    }

    #[test]
    fn test_low_confidence_frames_are_ignored() {
        let mut session = CalibrationSession::with_defaults(screen(), 2, 2).unwrap();
        session.begin(0.0);
        session.tick(0.3, None);
        session.tick(0.8, None);
        assert_eq!(session.phase(), Phase::Collecting);

        let weak = Extraction {
            features: Some(FeatureVector::from_array([0.5; 6])),
            confidence: 0.2,
            landmarks: None,
        };
        for i in 0..10 {
            session.tick(0.9 + f64::from(i) * 0.05, Some(&weak));
        }
        assert!(session.buffer.is_empty());
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut session = CalibrationSession::with_defaults(screen(), 2, 2).unwrap();
        session.begin(0.0);
        session.cancel();
        assert_eq!(session.phase(), Phase::Cancelled);
        assert!(session.outcome().is_none());

        // Ticks after cancellation change nothing
        session.tick(10.0, None);
        assert_eq!(session.phase(), Phase::Cancelled);
    }

    #[test]
    fn test_ease_out_cubic_shape() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        // Front-loaded: past half the motion well before half the time
        assert!(ease_out_cubic(0.5) > 0.8);
    }
}
