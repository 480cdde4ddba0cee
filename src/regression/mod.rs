//! Gaze mapping models and cross-validated model selection.
//!
//! Two model families compete for each calibration: degree-2 polynomial
//! ridge regression and an RBF Gaussian process. Both axes always use the
//! same family; selection compares mean cross-validation error across the
//! two screen axes and falls to the ridge model on ties or when the sample
//! count makes the Gaussian process inadvisable.

pub mod gaussian_process;
pub mod ridge;

use crate::error::{Error, Result};
use crate::types::{CalibrationSample, FeatureVector, Point2};
use self::gaussian_process::GpModel;
use self::ridge::RidgeModel;

/// Which regression family won model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    PolynomialRidge,
    GaussianProcess,
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PolynomialRidge => write!(f, "polynomial ridge"),
            Self::GaussianProcess => write!(f, "gaussian process"),
        }
    }
}

/// A fitted single-axis model of either family
#[derive(Debug, Clone)]
enum AxisModel {
    Ridge(RidgeModel),
    Gp(GpModel),
}

impl AxisModel {
    fn predict(&self, features: &FeatureVector) -> f64 {
        match self {
            Self::Ridge(m) => m.predict(features),
            Self::Gp(m) => m.predict(features),
        }
    }
}

/// The complete feature-to-screen mapping: one model per axis
#[derive(Debug, Clone)]
pub struct GazeModel {
    pub family: ModelFamily,
    x: AxisModel,
    y: AxisModel,
}

impl GazeModel {
    /// Map a feature vector to a screen position in pixels
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> Point2 {
        Point2::new(self.x.predict(features), self.y.predict(features))
    }
}

/// Hyperparameters and gates for training and model selection
#[derive(Debug, Clone, Copy)]
pub struct TrainingConfig {
    pub min_samples: usize,
    pub ridge_alpha: f64,
    pub max_folds: usize,
    pub gp_max_samples: usize,
    pub gp_restarts: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        use crate::constants::{
            DEFAULT_GP_MAX_SAMPLES, DEFAULT_GP_RESTARTS, DEFAULT_MAX_FOLDS, DEFAULT_MIN_SAMPLES,
            DEFAULT_RIDGE_ALPHA,
        };
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            ridge_alpha: DEFAULT_RIDGE_ALPHA,
            max_folds: DEFAULT_MAX_FOLDS,
            gp_max_samples: DEFAULT_GP_MAX_SAMPLES,
            gp_restarts: DEFAULT_GP_RESTARTS,
            seed: 0,
        }
    }
}

/// Outcome of training: the selected model plus its quality figures
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model: GazeModel,
    /// Cross-validation mean absolute error in pixels, averaged over axes
    pub cv_error: f64,
    /// In-sample mean absolute error per axis in pixels
    pub in_sample_mae: (f64, f64),
}

/// Contiguous fold boundaries in the unshuffled sample order: the first
/// `n % k` folds take one extra sample.
fn fold_ranges(n: usize, k: usize) -> Vec<(usize, usize)> {
    let base = n / k;
    let extra = n % k;
    let mut ranges = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let len = base + usize::from(i < extra);
        ranges.push((start, start + len));
        start += len;
    }
    ranges
}

fn split_axes(samples: &[CalibrationSample]) -> (Vec<FeatureVector>, Vec<f64>, Vec<f64>) {
    let features = samples.iter().map(|s| s.features).collect();
    let xs = samples.iter().map(|s| s.target.x).collect();
    let ys = samples.iter().map(|s| s.target.y).collect();
    (features, xs, ys)
}

fn mean_absolute_error(predictions: &[f64], targets: &[f64]) -> f64 {
    predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / predictions.len() as f64
}

/// Mean over folds of the held-out MAE for one axis, using the supplied fit
/// function. `None` when any fold fails to fit.
fn cross_validate_axis<F>(
    features: &[FeatureVector],
    targets: &[f64],
    ranges: &[(usize, usize)],
    fit: F,
) -> Option<f64>
where
    F: Fn(&[FeatureVector], &[f64]) -> Result<Box<dyn Fn(&FeatureVector) -> f64>>,
{
    let mut fold_errors = Vec::with_capacity(ranges.len());
    for &(lo, hi) in ranges {
        let mut train_f = Vec::with_capacity(features.len() - (hi - lo));
        let mut train_t = Vec::with_capacity(train_f.capacity());
        train_f.extend_from_slice(&features[..lo]);
        train_f.extend_from_slice(&features[hi..]);
        train_t.extend_from_slice(&targets[..lo]);
        train_t.extend_from_slice(&targets[hi..]);

        let predictor = fit(&train_f, &train_t).ok()?;
        let predictions: Vec<f64> = features[lo..hi].iter().map(|f| predictor(f)).collect();
        fold_errors.push(mean_absolute_error(&predictions, &targets[lo..hi]));
    }
    Some(fold_errors.iter().sum::<f64>() / fold_errors.len() as f64)
}

fn cv_error_both_axes<F>(
    features: &[FeatureVector],
    xs: &[f64],
    ys: &[f64],
    ranges: &[(usize, usize)],
    fit: &F,
) -> Option<f64>
where
    F: Fn(&[FeatureVector], &[f64]) -> Result<Box<dyn Fn(&FeatureVector) -> f64>>,
{
    let ex = cross_validate_axis(features, xs, ranges, fit)?;
    let ey = cross_validate_axis(features, ys, ranges, fit)?;
    Some((ex + ey) / 2.0)
}

fn ridge_fitter(
    alpha: f64,
) -> impl Fn(&[FeatureVector], &[f64]) -> Result<Box<dyn Fn(&FeatureVector) -> f64>> {
    move |features, targets| {
        let model = RidgeModel::fit(features, targets, alpha)?;
        Ok(Box::new(move |f: &FeatureVector| model.predict(f)) as Box<dyn Fn(&FeatureVector) -> f64>)
    }
}

fn gp_fitter(
    restarts: usize,
    seed: u64,
) -> impl Fn(&[FeatureVector], &[f64]) -> Result<Box<dyn Fn(&FeatureVector) -> f64>> {
    move |features, targets| {
        let model = GpModel::fit(features, targets, restarts, seed)?;
        Ok(Box::new(move |f: &FeatureVector| model.predict(f)) as Box<dyn Fn(&FeatureVector) -> f64>)
    }
}

/// Train the gaze mapping from calibration samples.
///
/// Both families are scored by k-fold cross-validation (k = min of the
/// configured maximum and the sample count, contiguous unshuffled folds) and
/// the winner is refit on the full sample set. The Gaussian process competes
/// only up to the configured sample cap and must beat the ridge error
/// strictly; any numerical failure discards it.
///
/// # Errors
///
/// Returns [`Error::Training`] when fewer than the minimum samples are
/// supplied or the winning family fails to fit on the full set.
pub fn train(samples: &[CalibrationSample], config: &TrainingConfig) -> Result<TrainingReport> {
    if samples.len() < config.min_samples {
        return Err(Error::Training(format!(
            "{} calibration samples retained, need at least {}",
            samples.len(),
            config.min_samples
        )));
    }

    let (features, xs, ys) = split_axes(samples);
    let k = config.max_folds.min(samples.len());
    let gp_eligible = samples.len() <= config.gp_max_samples;

    let ridge_fit = ridge_fitter(config.ridge_alpha);
    let gp_fit = gp_fitter(config.gp_restarts, config.seed);

    let (family, cv_error) = if k < 2 {
        // Too few samples for held-out folds; prefer the interpolating
        // family when it is eligible and fits.
        let gp_ok = gp_eligible
            && GpModel::fit(&features, &xs, config.gp_restarts, config.seed).is_ok()
            && GpModel::fit(&features, &ys, config.gp_restarts, config.seed).is_ok();
        if gp_ok {
            (ModelFamily::GaussianProcess, f64::NAN)
        } else {
            (ModelFamily::PolynomialRidge, f64::NAN)
        }
    } else {
        let ranges = fold_ranges(samples.len(), k);
        let ridge_err = cv_error_both_axes(&features, &xs, &ys, &ranges, &ridge_fit)
            .ok_or_else(|| Error::Training("ridge cross-validation failed".into()))?;
        let gp_err = if gp_eligible {
            cv_error_both_axes(&features, &xs, &ys, &ranges, &gp_fit)
        } else {
            None
        };

        match gp_err {
            Some(e) if e < ridge_err => {
                log::info!(
                    "selected gaussian process: cv error {e:.2}px vs ridge {ridge_err:.2}px"
                );
                (ModelFamily::GaussianProcess, e)
            }
            _ => {
                log::info!("selected polynomial ridge: cv error {ridge_err:.2}px");
                (ModelFamily::PolynomialRidge, ridge_err)
            }
        }
    };

    let (x, y) = match family {
        ModelFamily::PolynomialRidge => (
            AxisModel::Ridge(RidgeModel::fit(&features, &xs, config.ridge_alpha)?),
            AxisModel::Ridge(RidgeModel::fit(&features, &ys, config.ridge_alpha)?),
        ),
        ModelFamily::GaussianProcess => (
            AxisModel::Gp(GpModel::fit(&features, &xs, config.gp_restarts, config.seed)?),
            AxisModel::Gp(GpModel::fit(&features, &ys, config.gp_restarts, config.seed)?),
        ),
    };
    let model = GazeModel { family, x, y };

    let predicted: Vec<Point2> = features.iter().map(|f| model.predict(f)).collect();
    let mae_x =
        mean_absolute_error(&predicted.iter().map(|p| p.x).collect::<Vec<_>>(), &xs);
    let mae_y =
        mean_absolute_error(&predicted.iter().map(|p| p.y).collect::<Vec<_>>(), &ys);

    Ok(TrainingReport {
        model,
        cv_error,
        in_sample_mae: (mae_x, mae_y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(a: f64, b: f64, screen_w: f64, screen_h: f64) -> CalibrationSample {
        CalibrationSample {
            features: FeatureVector::from_array([
                a,
                b,
                a * 0.9,
                b * 0.9,
                (a - 0.5) * 40.0,
                (b - 0.5) * 30.0,
            ]),
            target: Point2::new(a * screen_w, b * screen_h),
        }
    }

    fn grid_samples(cols: usize, rows: usize) -> Vec<CalibrationSample> {
        let mut out = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                let a = c as f64 / (cols - 1) as f64;
                let b = r as f64 / (rows - 1) as f64;
                out.push(sample(a, b, 1440.0, 900.0));
            }
        }
        out
    }

    #[test]
    fn test_fold_ranges_partition_all_samples() {
        let ranges = fold_ranges(13, 5);
        assert_eq!(ranges.len(), 5);
        assert_eq!(ranges[0], (0, 3));
        assert_eq!(ranges[1], (3, 6));
        assert_eq!(ranges[2], (6, 9));
        assert_eq!(ranges[3], (9, 11));
        assert_eq!(ranges[4], (11, 13));
    }

    #[test]
    fn test_too_few_samples_is_an_error() {
        let samples = grid_samples(3, 3); // 9 < 10
        let err = train(&samples, &TrainingConfig::default()).unwrap_err();
        assert!(err.to_string().contains("calibration samples"));
    }

    #[test]
    fn test_training_on_grid_is_accurate() {
        let samples = grid_samples(5, 4);
        let report = train(&samples, &TrainingConfig::default()).unwrap();
        assert!(report.cv_error.is_finite());
        assert!(
            report.in_sample_mae.0 < 5.0 && report.in_sample_mae.1 < 5.0,
            "in-sample mae {:?}",
            report.in_sample_mae
        );

        let probe = sample(0.4, 0.6, 1440.0, 900.0);
        let predicted = report.model.predict(&probe.features);
        assert!(predicted.distance(&probe.target) < 40.0);
    }

    #[test]
    fn test_large_sample_count_disables_gp() {
        let mut samples = Vec::new();
        for i in 0..60 {
            let a = f64::from(i % 10) / 9.0;
            let b = f64::from(i / 10) / 5.0;
            samples.push(sample(a, b, 1920.0, 1080.0));
        }
        let report = train(&samples, &TrainingConfig::default()).unwrap();
        assert_eq!(report.model.family, ModelFamily::PolynomialRidge);
    }

    #[test]
    fn test_gp_cap_is_configurable() {
        let samples = grid_samples(5, 4);
        let config = TrainingConfig {
            gp_max_samples: 10,
            ..TrainingConfig::default()
        };
        // 20 samples exceed the lowered cap, so only ridge competes.
        let report = train(&samples, &config).unwrap();
        assert_eq!(report.model.family, ModelFamily::PolynomialRidge);
    }
}
