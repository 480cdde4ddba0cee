//! Calibration session behaviour over the synthetic pipeline


use gaze_tracking::session::{CalibrationOutcome, CalibrationSession, Phase};
use test_helpers::{
    expect_success, run_to_completion, synthetic_pipeline, test_screen,
};

#[test]
fn test_ten_targets_calibrate_successfully() {
    // A 5x2 grid yields exactly the minimum sample count for training.
    let mut session = CalibrationSession::with_defaults(test_screen(), 5, 2).unwrap();
    let mut pipeline = synthetic_pipeline(0.0, 0);
    run_to_completion(&mut session, &mut pipeline, 60.0);

    match expect_success(&session) {
        CalibrationOutcome::Success {
            per_target,
            mean_error_px,
            warning,
            ..
        } => {
            assert_eq!(per_target.len(), 10);
            assert!(*mean_error_px < 25.0, "mean error {mean_error_px}px");
            assert!(!warning);
        }
        CalibrationOutcome::Failure { .. } => unreachable!(),
    }
}

#[test]
fn test_nine_targets_fail_training() {
    // One sample short of the training minimum: the session completes but
    // reports a failure outcome naming the sample count.
    let mut session = CalibrationSession::with_defaults(test_screen(), 3, 3).unwrap();
    let mut pipeline = synthetic_pipeline(0.0, 0);
    run_to_completion(&mut session, &mut pipeline, 60.0);

    assert_eq!(session.phase(), Phase::Complete);
    match session.outcome().unwrap() {
        CalibrationOutcome::Failure { reason, retained } => {
            assert_eq!(*retained, 9);
            assert!(reason.contains("at least 10"), "reason: {reason}");
        }
        CalibrationOutcome::Success { .. } => panic!("9 samples must not train"),
    }
}

#[test]
fn test_absent_face_skips_targets_into_failure() {
    let mut session = CalibrationSession::with_defaults(test_screen(), 5, 4).unwrap();
    let mut pipeline = synthetic_pipeline(0.0, 0);
    // The face never shows up, so every target collects zero frames.
    pipeline.provider_mut().set_present(false);
    run_to_completion(&mut session, &mut pipeline, 60.0);

    match session.outcome().unwrap() {
        CalibrationOutcome::Failure { retained, .. } => assert_eq!(*retained, 0),
        CalibrationOutcome::Success { .. } => panic!("no frames must not calibrate"),
    }
}

#[test]
fn test_cancellation_leaves_no_outcome() {
    let mut session = CalibrationSession::with_defaults(test_screen(), 5, 4).unwrap();
    let mut pipeline = synthetic_pipeline(0.0, 0);
    session.begin(0.0);

    let mut now = 0.0;
    for _ in 0..120 {
        now += 1.0 / 60.0;
        let frame = if session.needs_frame() {
            pipeline.process().unwrap()
        } else {
            None
        };
        session.tick(now, frame.as_ref());
    }
    assert!(session.phase() != Phase::Complete);

    session.cancel();
    assert_eq!(session.phase(), Phase::Cancelled);
    assert!(session.outcome().is_none());
    assert!(!session.needs_frame());
}

#[test]
fn test_snapshot_progress_is_monotonic_while_collecting() {
    let mut session = CalibrationSession::with_defaults(test_screen(), 2, 2).unwrap();
    let mut pipeline = synthetic_pipeline(0.0, 0);
    session.begin(0.0);

    let mut now = 0.0;
    let mut last_progress = -1.0;
    while session.phase() != Phase::Transitioning {
        now += 1.0 / 60.0;
        if session.phase() == Phase::Collecting {
            let progress = session.snapshot(now).collect_progress;
            assert!(progress >= last_progress);
            assert!((0.0..=1.0).contains(&progress));
            last_progress = progress;
        }
        let frame = if session.needs_frame() {
            pipeline.process().unwrap()
        } else {
            None
        };
        session.tick(now, frame.as_ref());
        assert!(now < 60.0);
    }
    assert!(last_progress > 0.5, "collection progress never advanced");
}
