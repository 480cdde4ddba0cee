//! Gaze tracking demo: calibrate against a synthetic face, then track it.
//!
//! Real deployments implement `FrameSource` and `LandmarkProvider` for their
//! camera and face-mesh backend; this binary drives the full pipeline with
//! the built-in synthetic implementations on a simulated clock, which makes
//! it useful as a smoke test and as example wiring.

use anyhow::Result;
use clap::Parser;
use gaze_tracking::config::Config;
use gaze_tracking::pipeline::FramePipeline;
use gaze_tracking::session::{CalibrationOutcome, CalibrationSession, Phase};
use gaze_tracking::synthetic::{SyntheticFrameSource, SyntheticProvider};
use gaze_tracking::tracker::GazeTracker;
use gaze_tracking::types::{Point2, ScreenGeometry};
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Screen width in pixels
    #[arg(long, default_value = "1920")]
    width: f64,

    /// Screen height in pixels
    #[arg(long, default_value = "1080")]
    height: f64,

    /// Camera frame width in pixels
    #[arg(long, default_value = "640")]
    frame_width: u32,

    /// Camera frame height in pixels
    #[arg(long, default_value = "480")]
    frame_height: u32,

    /// Landmark jitter amplitude in pixels
    #[arg(short, long, default_value = "0.5")]
    jitter: f64,

    /// Seed for the jitter generator
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Number of tracking ticks to run after calibration
    #[arg(long, default_value = "90")]
    track_ticks: usize,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{}", gaze_tracking::config::EXAMPLE_CONFIG);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    let screen = ScreenGeometry::new(args.width, args.height);
    let source = SyntheticFrameSource::new(args.frame_width, args.frame_height);
    let provider = SyntheticProvider::new(args.width, args.height, args.frame_width, args.frame_height)
        .with_jitter(args.jitter, args.seed);
    let mut pipeline = FramePipeline::new(source, provider);

    info!(
        "Calibrating a {}x{} grid on a {:.0}x{:.0} screen",
        config.grid.cols, config.grid.rows, args.width, args.height
    );

    let mut session = CalibrationSession::new(
        screen,
        config.grid.cols,
        config.grid.rows,
        config.grid.margin_frac,
        config.phase_timing(),
        config.quality_gates(),
        config.training_config(),
        config.training.warn_error_pct,
    )?;
    session.begin(0.0);

    let dt = 1.0 / config.timing.calibration_hz;
    let mut now = 0.0;
    while session.phase() != Phase::Complete {
        now += dt;
        let snapshot = session.snapshot(now);
        // The synthetic subject obediently follows the dot
        pipeline.provider_mut().set_gaze(snapshot.dot);
        let frame = if session.needs_frame() {
            pipeline.process()?
        } else {
            None
        };
        session.tick(now, frame.as_ref());
    }

    let model = match session.outcome() {
        Some(CalibrationOutcome::Success {
            model,
            mean_error_px,
            mean_error_pct,
            warning,
            ..
        }) => {
            info!(
                "Calibration succeeded: {} model, mean error {:.2}px ({:.2}% of screen width)",
                model.family, mean_error_px, mean_error_pct
            );
            if *warning {
                log::warn!("Accuracy is poor; consider recalibrating");
            }
            model.clone()
        }
        Some(CalibrationOutcome::Failure { reason, retained }) => {
            anyhow::bail!("calibration failed with {retained} samples: {reason}");
        }
        None => anyhow::bail!("calibration ended without an outcome"),
    };

    let mut tracker = GazeTracker::new(
        config.tracking.smoothing_alpha,
        config.tracking.low_confidence,
    );
    tracker.set_model(model);

    // Sweep the synthetic gaze across the screen and report how well the
    // tracker follows it.
    let track_dt = 1.0 / config.timing.tracking_hz;
    let mut worst = 0.0_f64;
    for i in 0..args.track_ticks {
        let t = i as f64 / args.track_ticks.max(1) as f64;
        let looked_at = Point2::new(
            args.width * (0.1 + 0.8 * t),
            args.height * (0.5 + 0.4 * (t * std::f64::consts::TAU).sin() * 0.5),
        );
        pipeline.provider_mut().set_gaze(looked_at);
        now += track_dt;
        if let Some(update) = tracker.tick(&mut pipeline, now)? {
            if let Some(gaze) = update.gaze {
                worst = worst.max(gaze.distance(&looked_at));
                log::debug!(
                    "tick {i}: gaze ({:.0}, {:.0}) vs actual ({:.0}, {:.0}), {:.1} fps",
                    gaze.x,
                    gaze.y,
                    looked_at.x,
                    looked_at.y,
                    update.fps
                );
            }
        }
    }
    info!("Tracking finished; worst smoothed error {worst:.1}px");

    Ok(())
}
