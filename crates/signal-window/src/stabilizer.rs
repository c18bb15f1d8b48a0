//! Supermajority Label Stabilization
//!
//! Per-frame classifier output flickers. A label is only accepted once it
//! holds a supermajority of a full window of recent predictions.

use crate::window::SmoothingWindow;
use crate::WindowError;
use tracing::debug;

/// Default label window (1 second at 30 fps)
pub const DEFAULT_STATE_WINDOW: usize = 30;

/// Default share of the window the dominant label must hold
pub const DEFAULT_STABILITY_RATIO: f64 = 0.6;

/// Most frequent label in a window
#[derive(Debug, Clone, PartialEq)]
pub struct Majority<L> {
    pub label: L,
    pub count: usize,
    /// `count` relative to the number of labels in the window
    pub frequency: f64,
}

/// Rolling window of per-frame labels
#[derive(Debug, Clone)]
pub struct ClassificationWindow<L> {
    labels: SmoothingWindow<L>,
}

impl<L: Clone + PartialEq> ClassificationWindow<L> {
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        Ok(Self {
            labels: SmoothingWindow::new(capacity)?,
        })
    }

    pub fn push(&mut self, label: L) {
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.labels.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.labels.capacity()
    }

    /// Dominant label. Equal counts resolve to the label seen first in the window.
    pub fn majority(&self) -> Option<Majority<L>> {
        // Tallies in first-seen order
        let mut tallies: Vec<(&L, usize)> = Vec::new();
        for label in self.labels.iter() {
            match tallies.iter_mut().find(|(seen, _)| *seen == label) {
                Some((_, count)) => *count += 1,
                None => tallies.push((label, 1)),
            }
        }

        let mut best: Option<(&L, usize)> = None;
        for (label, count) in tallies {
            // Strict comparison keeps the earlier label on ties
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((label, count));
            }
        }

        best.map(|(label, count)| Majority {
            label: label.clone(),
            count,
            frequency: count as f64 / self.labels.len() as f64,
        })
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

/// Turns raw per-frame labels into an occasional stable label
#[derive(Debug, Clone)]
pub struct ClassificationStabilizer<L> {
    window: ClassificationWindow<L>,
    ratio: f64,
}

impl<L: Clone + PartialEq + std::fmt::Debug> ClassificationStabilizer<L> {
    /// Create a stabilizer over `capacity` frames requiring `ratio` agreement
    pub fn new(capacity: usize, ratio: f64) -> Result<Self, WindowError> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(WindowError::InvalidRatio(ratio));
        }
        Ok(Self {
            window: ClassificationWindow::new(capacity)?,
            ratio,
        })
    }

    /// Record a raw label. Returns the stable label only when the window is
    /// full and the dominant label reaches the ratio; `None` otherwise.
    pub fn push(&mut self, raw: L) -> Option<L> {
        self.window.push(raw);
        if !self.window.is_full() {
            return None;
        }

        let majority = self.window.majority()?;
        let share = majority.count as f64 / self.window.capacity() as f64;
        if share >= self.ratio {
            Some(majority.label)
        } else {
            debug!(
                "Ambiguous label window: {:?} holds {:.2} < {:.2}",
                majority.label, share, self.ratio
            );
            None
        }
    }

    pub fn window(&self) -> &ClassificationWindow<L> {
        &self.window
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}
