//! Fixed-Capacity FIFO Window

use crate::WindowError;
use std::collections::VecDeque;

/// Default smoothing window length (frames)
pub const DEFAULT_SMOOTHING_CAPACITY: usize = 5;

/// Ordered window of the last N samples; the oldest is evicted on overflow
#[derive(Debug, Clone)]
pub struct SmoothingWindow<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> SmoothingWindow<T> {
    /// Create an empty window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a sample, returning the evicted oldest sample if the window was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.data.len() >= self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the window holds `capacity` samples
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample
    pub fn back(&self) -> Option<&T> {
        self.data.back()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<T: Copy + Into<f64>> SmoothingWindow<T> {
    /// Arithmetic mean of the current contents (`None` while empty)
    pub fn mean(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        let sum: f64 = self.data.iter().map(|&v| v.into()).sum();
        Some(sum / self.data.len() as f64)
    }
}
