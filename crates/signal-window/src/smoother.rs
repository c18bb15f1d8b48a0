//! EAR / MAR Smoothing

use crate::window::SmoothingWindow;
use crate::WindowError;
use serde::{Deserialize, Serialize};

/// Metrics that get a smoothing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricId {
    /// Eye-aspect ratio
    Ear,
    /// Mouth-aspect ratio
    Mar,
}

/// Running-mean smoother, one window per metric
#[derive(Debug, Clone)]
pub struct MetricSmoother {
    ear: SmoothingWindow<f64>,
    mar: SmoothingWindow<f64>,
}

impl MetricSmoother {
    /// Create a smoother whose windows hold `capacity` frames each
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        Ok(Self {
            ear: SmoothingWindow::new(capacity)?,
            mar: SmoothingWindow::new(capacity)?,
        })
    }

    /// Add a raw sample and get the smoothed value back
    pub fn push(&mut self, metric: MetricId, raw: f64) -> f64 {
        let window = self.window_mut(metric);
        window.push(raw);
        window.mean().unwrap_or(raw)
    }

    /// Current smoothed value without pushing
    pub fn smoothed(&self, metric: MetricId) -> Option<f64> {
        self.window(metric).mean()
    }

    pub fn capacity(&self) -> usize {
        self.ear.capacity()
    }

    /// Drop all samples (session end)
    pub fn reset(&mut self) {
        self.ear.clear();
        self.mar.clear();
    }

    fn window(&self, metric: MetricId) -> &SmoothingWindow<f64> {
        match metric {
            MetricId::Ear => &self.ear,
            MetricId::Mar => &self.mar,
        }
    }

    fn window_mut(&mut self, metric: MetricId) -> &mut SmoothingWindow<f64> {
        match metric {
            MetricId::Ear => &mut self.ear,
            MetricId::Mar => &mut self.mar,
        }
    }
}
