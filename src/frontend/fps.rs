//! Smoothed frames-per-second estimate, for display only

use std::time::{Duration, Instant};

/// Exponentially smoothed frame rate.
///
/// The smoothing factor grows with the frame interval (`dt * 3`, clamped to
/// one), so slow frames move the estimate quickly and fast frames gently.
#[derive(Debug, Clone, Default)]
pub struct FpsEstimator {
    fps: Option<f64>,
    last: Option<Instant>,
}

impl FpsEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame at `now`
    pub fn tick(&mut self, now: Instant) {
        if let Some(last) = self.last.replace(now) {
            self.observe(now.saturating_duration_since(last));
        }
    }

    /// Record a frame that took `dt`
    pub fn observe(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if dt <= 0.0 {
            return;
        }
        let instant = 1.0 / dt;
        self.fps = Some(match self.fps {
            None => instant,
            Some(fps) => {
                let s = (dt * 3.0).clamp(0.0, 1.0);
                fps * (1.0 - s) + instant * s
            }
        });
    }

    /// Current estimate; zero before two frames were seen
    pub fn fps(&self) -> f64 {
        self.fps.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_interval_sets_estimate() {
        let mut fps = FpsEstimator::new();
        assert_eq!(fps.fps(), 0.0);
        fps.observe(Duration::from_millis(20));
        assert!((fps.fps() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_moves_towards_new_rate() {
        let mut fps = FpsEstimator::new();
        fps.observe(Duration::from_millis(10)); // 100 fps
        fps.observe(Duration::from_millis(100)); // 10 fps, s = 0.3
        assert!((fps.fps() - (100.0 * 0.7 + 10.0 * 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_long_frame_replaces_estimate() {
        let mut fps = FpsEstimator::new();
        fps.observe(Duration::from_millis(10));
        fps.observe(Duration::from_millis(500)); // s clamps to 1
        assert!((fps.fps() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_interval_ignored() {
        let mut fps = FpsEstimator::new();
        fps.observe(Duration::ZERO);
        assert_eq!(fps.fps(), 0.0);
    }
}
