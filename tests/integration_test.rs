//! End-to-end calibration and tracking over the synthetic pipeline


use gaze_tracking::regression::TrainingConfig;
use gaze_tracking::session::{
    CalibrationOutcome, CalibrationSession, PhaseTiming, QualityGates,
};
use gaze_tracking::tracker::{GazeTracker, TrackerStatus};
use gaze_tracking::types::Point2;
use test_helpers::{
    expect_success, run_to_completion, synthetic_pipeline, test_screen, SCREEN_H, SCREEN_W,
};

fn session_with_warning_threshold(warn_error_pct: f64) -> CalibrationSession {
    CalibrationSession::new(
        test_screen(),
        5,
        4,
        0.05,
        PhaseTiming::default(),
        QualityGates::default(),
        TrainingConfig::default(),
        warn_error_pct,
    )
    .unwrap()
}

#[test]
fn test_full_calibration_then_tracking() {
    let mut session = CalibrationSession::with_defaults(test_screen(), 5, 4).unwrap();
    let mut pipeline = synthetic_pipeline(0.5, 7);
    let mut now = run_to_completion(&mut session, &mut pipeline, 60.0);

    let model = match expect_success(&session) {
        CalibrationOutcome::Success {
            model,
            mean_error_px,
            mean_error_pct,
            warning,
            per_target,
            ..
        } => {
            assert_eq!(per_target.len(), 20);
            assert!(*mean_error_px < 40.0, "mean error {mean_error_px}px");
            assert!((mean_error_pct - mean_error_px / SCREEN_W * 100.0).abs() < 1e-9);
            assert!(!warning);
            model.clone()
        }
        CalibrationOutcome::Failure { .. } => unreachable!(),
    };

    let mut tracker = GazeTracker::default();
    tracker.set_model(model);

    for looked_at in [
        Point2::new(SCREEN_W * 0.25, SCREEN_H * 0.3),
        Point2::new(SCREEN_W * 0.75, SCREEN_H * 0.7),
        Point2::new(SCREEN_W * 0.5, SCREEN_H * 0.5),
    ] {
        pipeline.provider_mut().set_gaze(looked_at);
        let mut update = None;
        // Enough ticks for the smoother to converge on the new position
        for _ in 0..30 {
            now += 1.0 / 30.0;
            update = tracker.tick(&mut pipeline, now).unwrap();
        }
        let update = update.unwrap();
        assert_eq!(update.status, TrackerStatus::Tracking);
        let gaze = update.gaze.unwrap();
        assert!(
            gaze.distance(&looked_at) < 50.0,
            "tracked {gaze:?}, actual {looked_at:?}"
        );
    }
}

#[test]
fn test_warning_fires_only_above_threshold() {
    // Same data, two thresholds bracketing the achieved error: the warning
    // must track the comparison, not the data.
    let mut strict = session_with_warning_threshold(1e-9);
    let mut pipeline = synthetic_pipeline(1.5, 3);
    run_to_completion(&mut strict, &mut pipeline, 60.0);
    match expect_success(&strict) {
        CalibrationOutcome::Success { warning, mean_error_px, .. } => {
            assert!(*mean_error_px > 0.0);
            assert!(*warning);
        }
        CalibrationOutcome::Failure { .. } => unreachable!(),
    }

    let mut lenient = session_with_warning_threshold(1e9);
    let mut pipeline = synthetic_pipeline(1.5, 3);
    run_to_completion(&mut lenient, &mut pipeline, 60.0);
    match expect_success(&lenient) {
        CalibrationOutcome::Success { warning, .. } => assert!(!warning),
        CalibrationOutcome::Failure { .. } => unreachable!(),
    }
}

#[test]
fn test_calibration_is_deterministic() {
    let run = || {
        let mut session = CalibrationSession::with_defaults(test_screen(), 5, 2).unwrap();
        let mut pipeline = synthetic_pipeline(0.8, 11);
        run_to_completion(&mut session, &mut pipeline, 60.0);
        match session.outcome().unwrap() {
            CalibrationOutcome::Success { mean_error_px, .. } => *mean_error_px,
            CalibrationOutcome::Failure { reason, .. } => panic!("failed: {reason}"),
        }
    };
    assert_eq!(run(), run());
}
