/// Decides whether the vector is actually rotating, from the angle seen on each render tick.
///
/// The absolute angle change per tick is low-pass filtered; the vector counts as running
/// while the filtered change stays above a threshold. Jumps bigger than `wrap_bound` are
/// taken to be the 360°→0° seam (or a calibration) and left out of the filter entirely.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    alpha: f64,
    threshold: f64,
    wrap_bound: f64,
    smoothed: f64,
    last_angle: Option<f64>,
}

impl MotionEstimator {
    pub const DEFAULT_ALPHA: f64 = 0.1;
    pub const DEFAULT_THRESHOLD: f64 = 0.2;
    pub const DEFAULT_WRAP_BOUND: f64 = 2.0;

    pub fn new(alpha: f64, threshold: f64, wrap_bound: f64) -> Self {
        Self {
            alpha,
            threshold,
            wrap_bound,
            smoothed: 0.0,
            last_angle: None,
        }
    }

    /// Feed the angle of this tick and return the running classification.
    pub fn update(&mut self, angle_degrees: f64) -> bool {
        if let Some(last) = self.last_angle {
            let delta = (angle_degrees - last).abs();
            if delta <= self.wrap_bound {
                self.smoothed = self.alpha * delta + (1.0 - self.alpha) * self.smoothed;
            }
        }
        self.last_angle = Some(angle_degrees);
        self.is_running()
    }

    pub fn is_running(&self) -> bool {
        self.smoothed > self.threshold
    }

    pub fn smoothed_delta(&self) -> f64 {
        self.smoothed
    }
}

impl Default for MotionEstimator {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_ALPHA,
            Self::DEFAULT_THRESHOLD,
            Self::DEFAULT_WRAP_BOUND,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(estimator: &mut MotionEstimator, start: f64, step: f64, ticks: usize) -> f64 {
        let mut angle = start;
        for _ in 0..ticks {
            angle = (angle + step).rem_euclid(360.0);
            estimator.update(angle);
        }
        angle
    }

    #[test]
    fn test_starts_stopped() {
        let mut estimator = MotionEstimator::default();
        assert!(!estimator.is_running());
        assert!(!estimator.update(10.0));
    }

    #[test]
    fn test_constant_angle_settles_to_stopped() {
        let mut estimator = MotionEstimator::default();
        let angle = feed(&mut estimator, 0.0, 0.6, 100);
        assert!(estimator.is_running());

        feed(&mut estimator, angle, 0.0, 100);
        assert!(!estimator.is_running());
    }

    #[test]
    fn test_steady_rotation_classifies_running() {
        let mut estimator = MotionEstimator::default();
        feed(&mut estimator, 0.0, 0.4, 100);
        assert!(estimator.is_running());
        assert!((estimator.smoothed_delta() - 0.4).abs() < 0.01);
    }

    #[test]
    fn test_single_outlier_does_not_flip_classification() {
        let mut stopped = MotionEstimator::default();
        feed(&mut stopped, 50.0, 0.0, 50);
        stopped.update(55.0);
        assert!(!stopped.is_running());

        let mut running = MotionEstimator::default();
        let angle = feed(&mut running, 0.0, 0.6, 100);
        let smoothed = running.smoothed_delta();
        running.update(angle + 3.0);
        assert!(running.is_running());
        assert_eq!(running.smoothed_delta(), smoothed);
    }

    #[test]
    fn test_wraparound_seam_is_ignored() {
        let mut estimator = MotionEstimator::default();
        feed(&mut estimator, 300.0, 0.6, 100);
        let before = estimator.smoothed_delta();
        // 359.8 -> 0.4 looks like a 359.4° jump
        estimator.update(359.8);
        estimator.update(0.4);
        assert!(estimator.is_running());
        assert!(estimator.smoothed_delta() <= before + 0.1);
    }
}
