//! Temporal logit averaging.
//!
//! Per-frame logits are noisy. Summing the last few vectors before taking the
//! arg-max is a cheap low-pass filter: it costs up to `capacity` frames of
//! lag and removes most single-frame spikes. Only the arg-max is used, so
//! the sum is never divided.

use super::types::{argmax, LogitVector};
use ndarray::Array1;
use std::collections::VecDeque;

/// Default number of logit vectors kept.
pub const DEFAULT_LOGIT_WINDOW: usize = 12;

/// Sliding window of recent logits.
#[derive(Debug, Clone)]
pub struct LogitAverager {
    history: VecDeque<LogitVector>,
    capacity: usize,
}

impl LogitAverager {
    /// `capacity` is clamped to at least 1 (1 means no averaging).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffers `logits` and returns the arg-max of the windowed sum.
    ///
    /// Early frames average over fewer samples. Ties go to the lowest index.
    pub fn observe(&mut self, logits: LogitVector) -> usize {
        // A vector of a different length cannot be summed with the window;
        // start a fresh window from it.
        if self.history.front().is_some_and(|v| v.len() != logits.len()) {
            log::warn!(
                "Logit length changed from {} to {}, restarting averaging window",
                self.history.front().map_or(0, LogitVector::len),
                logits.len()
            );
            self.history.clear();
        }

        self.history.push_back(logits);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let sum = self.sum();
        argmax(sum.view()).unwrap_or(0)
    }

    /// Element-wise sum of the buffered vectors.
    pub fn sum(&self) -> Array1<f32> {
        let width = self.history.front().map_or(0, LogitVector::len);
        self.history
            .iter()
            .fold(Array1::zeros(width), |acc, v| acc + v.as_array())
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl Default for LogitAverager {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIT_WINDOW)
    }
}
