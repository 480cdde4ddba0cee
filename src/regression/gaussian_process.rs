//! Gaussian-process regression for one screen axis.
//!
//! RBF kernel plus a white-noise term, hyperparameters chosen by maximizing
//! the log marginal likelihood from a few random restarts. Targets are
//! normalized internally so the unit-scale kernel priors behave across
//! screen-pixel magnitudes.

use crate::error::{Error, Result};
use crate::types::FeatureVector;
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INITIAL_LENGTH_SCALE: f64 = 1.0;
const INITIAL_NOISE: f64 = 1.0;
/// Log-space search bounds for both hyperparameters, matching the usual
/// 1e-5..1e5 box.
const LOG_BOUND: f64 = 11.512_925_464_970_229;
const OPT_ITERATIONS: usize = 40;

/// A fitted Gaussian-process model predicting one screen coordinate
#[derive(Debug, Clone)]
pub struct GpModel {
    train_x: Vec<[f64; FeatureVector::DIMS]>,
    alpha: DVector<f64>,
    length_scale: f64,
    target_mean: f64,
    target_std: f64,
}

fn squared_distance(a: &[f64; FeatureVector::DIMS], b: &[f64; FeatureVector::DIMS]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn kernel_matrix(
    points: &[[f64; FeatureVector::DIMS]],
    length_scale: f64,
    noise: f64,
) -> DMatrix<f64> {
    let n = points.len();
    let mut k = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let v = (-0.5 * squared_distance(&points[i], &points[j]) / length_scale.powi(2)).exp();
            k[(i, j)] = v;
            k[(j, i)] = v;
        }
        k[(i, i)] += noise;
    }
    k
}

/// Log marginal likelihood of the normalized targets under the kernel, or
/// `None` when the kernel matrix is not positive definite.
fn log_marginal_likelihood(
    points: &[[f64; FeatureVector::DIMS]],
    targets: &DVector<f64>,
    length_scale: f64,
    noise: f64,
) -> Option<(f64, Cholesky<f64, Dyn>)> {
    let k = kernel_matrix(points, length_scale, noise);
    let chol = k.cholesky()?;
    let alpha = chol.solve(targets);

    let log_det = chol.l().diagonal().iter().map(|d| d.ln()).sum::<f64>() * 2.0;
    let n = points.len() as f64;
    let lml = -0.5 * targets.dot(&alpha)
        - 0.5 * log_det
        - 0.5 * n * (2.0 * std::f64::consts::PI).ln();
    lml.is_finite().then_some((lml, chol))
}

/// Coordinate-ascent search over log length-scale and log noise from one
/// starting point. Returns the best hyperparameters with their likelihood.
fn optimize_from(
    points: &[[f64; FeatureVector::DIMS]],
    targets: &DVector<f64>,
    start: (f64, f64),
) -> Option<((f64, f64), f64)> {
    let mut log_params = [start.0.ln(), start.1.ln()];
    let mut best = log_marginal_likelihood(
        points,
        targets,
        log_params[0].exp(),
        log_params[1].exp(),
    )?
    .0;

    let mut step = 1.0;
    for _ in 0..OPT_ITERATIONS {
        let mut improved = false;
        for p in 0..2 {
            for direction in [step, -step] {
                let mut trial = log_params;
                trial[p] = (trial[p] + direction).clamp(-LOG_BOUND, LOG_BOUND);
                if let Some((lml, _)) =
                    log_marginal_likelihood(points, targets, trial[0].exp(), trial[1].exp())
                {
                    if lml > best {
                        best = lml;
                        log_params = trial;
                        improved = true;
                    }
                }
            }
        }
        if !improved {
            step *= 0.5;
            if step < 1e-3 {
                break;
            }
        }
    }

    Some(((log_params[0].exp(), log_params[1].exp()), best))
}

impl GpModel {
    /// Fit the model to aligned features and targets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Training`] when the inputs are empty or mismatched,
    /// or when no hyperparameter candidate yields a positive-definite kernel
    /// matrix.
    pub fn fit(
        features: &[FeatureVector],
        targets: &[f64],
        restarts: usize,
        seed: u64,
    ) -> Result<Self> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(Error::Training(format!(
                "gp fit needs matching non-empty inputs, got {} features and {} targets",
                features.len(),
                targets.len()
            )));
        }

        let train_x: Vec<[f64; FeatureVector::DIMS]> =
            features.iter().map(FeatureVector::as_array).collect();

        let n = targets.len() as f64;
        let target_mean = targets.iter().sum::<f64>() / n;
        let variance = targets.iter().map(|t| (t - target_mean).powi(2)).sum::<f64>() / n;
        let target_std = variance.sqrt().max(1e-12);
        let normalized =
            DVector::from_iterator(targets.len(), targets.iter().map(|t| (t - target_mean) / target_std));

        let mut rng = StdRng::seed_from_u64(seed);
        let mut starts = vec![(INITIAL_LENGTH_SCALE, INITIAL_NOISE)];
        for _ in 0..restarts {
            starts.push((
                rng.gen_range(-LOG_BOUND..LOG_BOUND).exp(),
                rng.gen_range(-LOG_BOUND..LOG_BOUND).exp(),
            ));
        }

        let mut best: Option<((f64, f64), f64)> = None;
        for start in starts {
            if let Some(candidate) = optimize_from(&train_x, &normalized, start) {
                if best.map_or(true, |(_, lml)| candidate.1 > lml) {
                    best = Some(candidate);
                }
            }
        }

        let ((length_scale, noise), lml) = best.ok_or_else(|| {
            Error::Training("gp kernel matrix is not positive definite for any candidate".into())
        })?;
        log::debug!(
            "gp hyperparameters: length_scale={length_scale:.4} noise={noise:.4} lml={lml:.3}"
        );

        let (_, chol) = log_marginal_likelihood(&train_x, &normalized, length_scale, noise)
            .ok_or_else(|| Error::Training("gp kernel became indefinite after tuning".into()))?;
        let alpha = chol.solve(&normalized);

        Ok(Self {
            train_x,
            alpha,
            length_scale,
            target_mean,
            target_std,
        })
    }

    /// Posterior mean for one feature vector
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let query = features.as_array();
        let weighted: f64 = self
            .train_x
            .iter()
            .zip(self.alpha.iter())
            .map(|(x, a)| {
                (-0.5 * squared_distance(x, &query) / self.length_scale.powi(2)).exp() * a
            })
            .sum();
        weighted * self.target_std + self.target_mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(a: f64, b: f64) -> FeatureVector {
        FeatureVector::from_array([a, b, a * 0.5, b * 0.5, a * 20.0, b * 20.0])
    }

    #[test]
    fn test_interpolates_training_points() {
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for i in 0..4 {
            for j in 0..3 {
                let a = f64::from(i) / 3.0;
                let b = f64::from(j) / 2.0;
                features.push(feature(a, b));
                targets.push(100.0 + 900.0 * a + 500.0 * b);
            }
        }

        let model = GpModel::fit(&features, &targets, 2, 42).unwrap();
        for (f, t) in features.iter().zip(&targets) {
            let p = model.predict(f);
            assert!((p - t).abs() < 15.0, "prediction {p} vs target {t}");
        }
    }

    #[test]
    fn test_constant_targets() {
        let features: Vec<_> = (0..8).map(|i| feature(f64::from(i) * 0.12, 0.4)).collect();
        let targets = vec![512.0; 8];
        let model = GpModel::fit(&features, &targets, 2, 7).unwrap();
        assert!((model.predict(&feature(0.5, 0.4)) - 512.0).abs() < 5.0);
    }

    #[test]
    fn test_kernel_operates_on_raw_features() {
        // The RBF kernel sees the 6 raw components, not the polynomial
        // basis used by the ridge family.
        let features: Vec<_> = (0..6).map(|i| feature(f64::from(i) * 0.2, 0.5)).collect();
        let targets: Vec<f64> = (0..6).map(|i| 100.0 * f64::from(i)).collect();
        let model = GpModel::fit(&features, &targets, 2, 1).unwrap();

        assert_eq!(model.train_x.len(), features.len());
        for (stored, f) in model.train_x.iter().zip(&features) {
            assert_eq!(stored, &f.as_array());
        }
    }

    #[test]
    fn test_mismatched_inputs_rejected() {
        let features = vec![feature(0.1, 0.2); 3];
        assert!(GpModel::fit(&features, &[1.0, 2.0], 2, 0).is_err());
        assert!(GpModel::fit(&[], &[], 2, 0).is_err());
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() {
        let features: Vec<_> = (0..10)
            .map(|i| feature(f64::from(i) * 0.1, f64::from(i % 3) * 0.3))
            .collect();
        let targets: Vec<f64> = (0..10).map(|i| 50.0 * f64::from(i)).collect();

        let a = GpModel::fit(&features, &targets, 2, 99).unwrap();
        let b = GpModel::fit(&features, &targets, 2, 99).unwrap();
        let probe = feature(0.33, 0.21);
        assert_eq!(a.predict(&probe), b.predict(&probe));
    }
}
