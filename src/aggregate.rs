//! Outlier-robust aggregation of per-frame feature vectors.
//!
//! Reduces the buffer collected at one calibration target into a single
//! representative sample, or rejects the target when too few frames survive
//! the robust z-score filter.

use crate::constants::AGGREGATE_STD_EPSILON;
use crate::types::FeatureVector;

/// Aggregate a buffer of feature vectors into their outlier-filtered mean.
///
/// Requires at least `min_buffer` frames; each frame's robust score is the
/// maximum over dimensions of |value - mean| / std, and frames with a score
/// at or above `outlier_z` are discarded (the boundary counts as an
/// outlier). Returns `None` unless at least `min_retained` frames survive.
#[must_use]
pub fn aggregate(
    buffer: &[FeatureVector],
    min_buffer: usize,
    min_retained: usize,
    outlier_z: f64,
) -> Option<FeatureVector> {
    if buffer.len() < min_buffer {
        return None;
    }

    let n = buffer.len() as f64;
    let mut mean = [0.0; FeatureVector::DIMS];
    for sample in buffer {
        for (m, v) in mean.iter_mut().zip(sample.as_array()) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= n;
    }

    let mut std = [0.0; FeatureVector::DIMS];
    for sample in buffer {
        for (s, (v, m)) in std.iter_mut().zip(sample.as_array().into_iter().zip(mean)) {
            *s += (v - m).powi(2);
        }
    }
    for s in &mut std {
        *s = (*s / n).sqrt() + AGGREGATE_STD_EPSILON;
    }

    let retained: Vec<&FeatureVector> = buffer
        .iter()
        .filter(|sample| {
            let score = sample
                .as_array()
                .into_iter()
                .zip(mean.iter().zip(&std))
                .map(|(v, (m, s))| (v - m).abs() / s)
                .fold(0.0_f64, f64::max);
            score < outlier_z
        })
        .collect();

    if retained.len() < min_retained {
        log::debug!(
            "target rejected: {} of {} frames survived outlier filtering",
            retained.len(),
            buffer.len()
        );
        return None;
    }

    let k = retained.len() as f64;
    let mut avg = [0.0; FeatureVector::DIMS];
    for sample in &retained {
        for (a, v) in avg.iter_mut().zip(sample.as_array()) {
            *a += v;
        }
    }
    for a in &mut avg {
        *a /= k;
    }

    Some(FeatureVector::from_array(avg))
}
