//! PERCLOS (Percentage of Eye Closure)
//!
//! Share of recent frames in which the eyes were closed. Higher PERCLOS
//! indicates drowsiness.

use crate::window::SmoothingWindow;
use crate::WindowError;

/// Default PERCLOS window (60 seconds at 30 fps)
pub const DEFAULT_PERCLOS_WINDOW: usize = 1800;

/// EAR below this counts as a closed-eye frame
pub const DEFAULT_PERCLOS_EAR_THRESHOLD: f64 = 0.2;

/// Rolling PERCLOS over the last N frames
#[derive(Debug, Clone)]
pub struct PerclosTracker {
    frames: SmoothingWindow<bool>,
    closed: usize,
    ear_threshold: f64,
}

impl PerclosTracker {
    pub fn new(capacity: usize, ear_threshold: f64) -> Result<Self, WindowError> {
        if !ear_threshold.is_finite() {
            return Err(WindowError::InvalidThreshold(ear_threshold));
        }
        Ok(Self {
            frames: SmoothingWindow::new(capacity)?,
            closed: 0,
            ear_threshold,
        })
    }

    /// Record one frame's (smoothed) EAR and return the updated PERCLOS
    pub fn update(&mut self, ear: f64) -> f64 {
        let is_closed = ear < self.ear_threshold;
        if is_closed {
            self.closed += 1;
        }
        if let Some(true) = self.frames.push(is_closed) {
            self.closed -= 1;
        }
        self.perclos()
    }

    /// Current PERCLOS in [0, 1]; 0 before any frame
    pub fn perclos(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.closed as f64 / self.frames.len() as f64
    }

    pub fn reset(&mut self) {
        self.frames.clear();
        self.closed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        let tracker = PerclosTracker::new(10, 0.2).unwrap();
        assert_eq!(tracker.perclos(), 0.0);
    }

    #[test]
    fn test_ratio_over_partial_window() {
        let mut tracker = PerclosTracker::new(10, 0.2).unwrap();
        tracker.update(0.3);
        tracker.update(0.1);
        tracker.update(0.3);
        let perclos = tracker.update(0.1);
        assert!((perclos - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_closed_frames_age_out() {
        let mut tracker = PerclosTracker::new(4, 0.2).unwrap();
        for _ in 0..4 {
            tracker.update(0.1);
        }
        assert_eq!(tracker.perclos(), 1.0);

        for _ in 0..3 {
            tracker.update(0.3);
        }
        assert!((tracker.perclos() - 0.25).abs() < 1e-12);

        tracker.update(0.3);
        assert_eq!(tracker.perclos(), 0.0);
    }

    #[test]
    fn test_nan_ear_counts_as_open() {
        let mut tracker = PerclosTracker::new(4, 0.2).unwrap();
        assert_eq!(tracker.update(f64::NAN), 0.0);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        assert_eq!(
            PerclosTracker::new(4, f64::INFINITY).unwrap_err(),
            WindowError::InvalidThreshold(f64::INFINITY)
        );
    }
}
