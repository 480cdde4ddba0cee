//! Degree-2 polynomial ridge regression for one screen axis.
//!
//! The six raw features are expanded into all degree-two monomials (6 linear
//! terms plus 21 pairwise products) and fit with an L2-penalized least
//! squares solve. The intercept is left unpenalized by centering the design
//! matrix and targets before solving.

use crate::error::{Error, Result};
use crate::types::FeatureVector;
use nalgebra::{DMatrix, DVector};

/// Number of expanded polynomial terms: 6 linear + 21 quadratic
pub const EXPANDED_DIMS: usize = 27;

/// A fitted ridge model predicting one screen coordinate
#[derive(Debug, Clone)]
pub struct RidgeModel {
    feature_means: DVector<f64>,
    weights: DVector<f64>,
    intercept: f64,
}

/// Expand a feature vector into the degree-2 polynomial basis (no bias term;
/// the intercept is handled by the fit).
#[must_use]
pub fn expand(features: &FeatureVector) -> [f64; EXPANDED_DIMS] {
    let raw = features.as_array();
    let mut out = [0.0; EXPANDED_DIMS];
    out[..raw.len()].copy_from_slice(&raw);
    let mut k = raw.len();
    for i in 0..raw.len() {
        for j in i..raw.len() {
            out[k] = raw[i] * raw[j];
            k += 1;
        }
    }
    out
}

impl RidgeModel {
    /// Fit the model to aligned features and targets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Training`] when the inputs are empty, mismatched, or
    /// the penalized normal equations cannot be solved.
    pub fn fit(features: &[FeatureVector], targets: &[f64], alpha: f64) -> Result<Self> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(Error::Training(format!(
                "ridge fit needs matching non-empty inputs, got {} features and {} targets",
                features.len(),
                targets.len()
            )));
        }

        let n = features.len();
        let mut design = DMatrix::zeros(n, EXPANDED_DIMS);
        for (row, f) in features.iter().enumerate() {
            for (col, v) in expand(f).into_iter().enumerate() {
                design[(row, col)] = v;
            }
        }

        let feature_means = design.row_mean().transpose();
        for mut row in design.row_iter_mut() {
            row -= feature_means.transpose();
        }
        let target_mean = targets.iter().sum::<f64>() / n as f64;
        let centered_targets = DVector::from_iterator(n, targets.iter().map(|t| t - target_mean));

        // (Xc^T Xc + alpha I) w = Xc^T yc
        let mut gram = design.transpose() * &design;
        for d in 0..EXPANDED_DIMS {
            gram[(d, d)] += alpha;
        }
        let rhs = design.transpose() * centered_targets;

        let weights = match gram.clone().cholesky() {
            Some(chol) => chol.solve(&rhs),
            None => gram
                .lu()
                .solve(&rhs)
                .ok_or_else(|| Error::Training("ridge normal equations are singular".into()))?,
        };

        Ok(Self {
            intercept: target_mean,
            feature_means,
            weights,
        })
    }

    /// Predict the screen coordinate for one feature vector
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        expand(features)
            .into_iter()
            .enumerate()
            .map(|(i, v)| (v - self.feature_means[i]) * self.weights[i])
            .sum::<f64>()
            + self.intercept
    }
}
