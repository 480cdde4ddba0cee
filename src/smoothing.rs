//! Exponential smoothing of predicted gaze positions.

use crate::types::Point2;

/// First-order exponential moving average over screen positions.
///
/// Alpha is the weight of the newest prediction; 1.0 disables smoothing.
#[derive(Debug, Clone)]
pub struct GazeSmoother {
    alpha: f64,
    state: Option<Point2>,
}

impl GazeSmoother {
    /// # Panics
    ///
    /// Panics when `alpha` is outside (0, 1].
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!(
            alpha > 0.0 && alpha <= 1.0,
            "smoothing alpha must be in (0, 1], got {alpha}"
        );
        Self { alpha, state: None }
    }

    /// Fold one raw prediction into the smoothed position
    pub fn apply(&mut self, raw: Point2) -> Point2 {
        let smoothed = match self.state {
            Some(prev) => Point2::new(
                prev.x + self.alpha * (raw.x - prev.x),
                prev.y + self.alpha * (raw.y - prev.y),
            ),
            None => raw,
        };
        self.state = Some(smoothed);
        smoothed
    }

    /// Drop the history, e.g. after the face was lost
    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_passes_through() {
        let mut smoother = GazeSmoother::new(0.35);
        let p = smoother.apply(Point2::new(100.0, 200.0));
        assert_eq!(p, Point2::new(100.0, 200.0));
    }

    #[test]
    fn test_smoothing_lags_a_step_change() {
        let mut smoother = GazeSmoother::new(0.35);
        smoother.apply(Point2::new(0.0, 0.0));
        let p = smoother.apply(Point2::new(100.0, 0.0));
        assert!((p.x - 35.0).abs() < 1e-12);

        // Repeated input converges towards it
        let mut last = p;
        for _ in 0..50 {
            last = smoother.apply(Point2::new(100.0, 0.0));
        }
        assert!((last.x - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut smoother = GazeSmoother::new(0.35);
        smoother.apply(Point2::new(0.0, 0.0));
        smoother.reset();
        let p = smoother.apply(Point2::new(500.0, 500.0));
        assert_eq!(p, Point2::new(500.0, 500.0));
    }

    #[test]
    fn test_alpha_one_is_identity() {
        let mut smoother = GazeSmoother::new(1.0);
        smoother.apply(Point2::new(0.0, 0.0));
        let p = smoother.apply(Point2::new(42.0, 7.0));
        assert_eq!(p, Point2::new(42.0, 7.0));
    }

    #[test]
    #[should_panic(expected = "smoothing alpha")]
    fn test_invalid_alpha_panics() {
        let _ = GazeSmoother::new(0.0);
    }
}
