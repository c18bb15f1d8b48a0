//! Rolling Signal Windows
//!
//! Fixed-capacity FIFO windows used to stabilize per-frame driver signals:
//! - Running means for EAR / MAR
//! - Supermajority vote over classifier labels
//! - PERCLOS over the last minute of frames

mod perclos;
mod smoother;
mod stabilizer;
mod window;

pub use perclos::{PerclosTracker, DEFAULT_PERCLOS_EAR_THRESHOLD, DEFAULT_PERCLOS_WINDOW};
pub use smoother::{MetricId, MetricSmoother};
pub use stabilizer::{
    ClassificationStabilizer, ClassificationWindow, Majority, DEFAULT_STABILITY_RATIO,
    DEFAULT_STATE_WINDOW,
};
pub use window::{SmoothingWindow, DEFAULT_SMOOTHING_CAPACITY};

use thiserror::Error;

/// Window construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("Window capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Stability ratio {0} is outside (0, 1]")]
    InvalidRatio(f64),

    #[error("Threshold {0} is not a finite number")]
    InvalidThreshold(f64),
}
