//! Rule-based label debouncing.
//!
//! Turns the smoothed per-frame index into a low-flicker label stream. For
//! each call, with `prev` the last stable label:
//!
//! 1. a masked transient class is replaced by `prev`;
//! 2. the "doing other things" class collapses to idle;
//! 3. a change away from `prev` is refused unless the last two stable labels
//!    agree (the previous label must itself have held for a frame);
//! 4. the result is appended to the bounded history.
//!
//! The rules run one after another; each sees the output of the previous one.

use crate::categories::{IDLE_CLASS, MASKED_CLASSES, OTHER_CLASS};
use crate::config::SmoothingConfig;
use std::collections::VecDeque;

/// Default capacity of the label history.
pub const DEFAULT_LABEL_HISTORY: usize = 20;

/// Debounce state machine owning its label history.
#[derive(Debug, Clone)]
pub struct LabelStabilizer {
    history: VecDeque<usize>,
    capacity: usize,
    idle_class: usize,
    other_class: usize,
    masked: Vec<usize>,
    refine: bool,
}

impl LabelStabilizer {
    pub fn new(config: &SmoothingConfig) -> Self {
        let capacity = config.label_history.max(2);
        let mut history = VecDeque::with_capacity(capacity + 1);
        history.push_back(config.idle_class);
        Self {
            history,
            capacity,
            idle_class: config.idle_class,
            other_class: config.other_class,
            masked: config.masked_classes.clone(),
            refine: config.refine_output,
        }
    }

    /// Maps a smoothed index to the stable index and records it.
    ///
    /// With refinement disabled the raw index is returned unchanged and the
    /// history is left alone.
    pub fn stabilize(&mut self, raw_index: usize) -> usize {
        if !self.refine {
            return raw_index;
        }

        let prev = self.last();
        let mut index = raw_index;

        if self.masked.contains(&index) {
            index = prev;
        }

        if index == self.other_class {
            index = self.idle_class;
        }

        if index != prev && self.history.len() >= 2 {
            let before_prev = self.history[self.history.len() - 2];
            if before_prev != prev {
                index = prev;
            }
        }

        self.history.push_back(index);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        if index != prev {
            log::debug!("Stable label changed {} -> {} (raw {})", prev, index, raw_index);
        }
        index
    }

    /// Most recent stable label (the idle seed before the first call).
    pub fn last(&self) -> usize {
        self.history.back().copied().unwrap_or(self.idle_class)
    }

    pub fn history(&self) -> &VecDeque<usize> {
        &self.history
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

    /// Back to a single idle entry.
    pub fn reset(&mut self) {
        self.history.clear();
        self.history.push_back(self.idle_class);
    }

    /// Replaces the history, keeping at most `capacity` newest entries.
    pub fn with_history(mut self, entries: impl IntoIterator<Item = usize>) -> Self {
        self.history = entries.into_iter().collect();
        if self.history.is_empty() {
            self.history.push_back(self.idle_class);
        }
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
        self
    }
}

impl Default for LabelStabilizer {
    fn default() -> Self {
        Self::new(&SmoothingConfig {
            label_history: DEFAULT_LABEL_HISTORY,
            idle_class: IDLE_CLASS,
            other_class: OTHER_CLASS,
            masked_classes: MASKED_CLASSES.to_vec(),
            ..SmoothingConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(s: &LabelStabilizer) -> Vec<usize> {
        s.history().iter().copied().collect()
    }

    #[test]
    fn test_seeded_with_idle() {
        let s = LabelStabilizer::default();
        assert_eq!(history_of(&s), vec![IDLE_CLASS]);
    }

    #[test]
    fn test_masked_class_replaced_by_previous() {
        let mut s = LabelStabilizer::default().with_history([5, 5]);
        assert_eq!(s.stabilize(7), 5);
        for masked in [3, 8, 21, 22] {
            assert_eq!(s.stabilize(masked), 5);
        }
    }

    #[test]
    fn test_other_things_collapses_to_idle() {
        let mut s = LabelStabilizer::default();
        assert_eq!(s.stabilize(0), 2);
        assert_eq!(history_of(&s), vec![2, 2]);
    }

    #[test]
    fn test_first_call_accepts_change_from_single_seed() {
        // Only one entry: suppression needs two, so the change goes through.
        let mut s = LabelStabilizer::default();
        assert_eq!(s.stabilize(14), 14);
    }

    #[test]
    fn test_flicker_scenario() {
        let mut s = LabelStabilizer::default().with_history([2, 2]);
        assert_eq!(s.stabilize(9), 9);
        assert_eq!(history_of(&s), vec![2, 2, 9]);
        assert_eq!(s.stabilize(2), 9);
        assert_eq!(history_of(&s), vec![2, 2, 9, 9]);
        // Now stable on 9, so a change is accepted again.
        assert_eq!(s.stabilize(2), 2);
    }

    #[test]
    fn test_masking_runs_before_suppression() {
        // Masked raw becomes prev, so suppression sees no change.
        let mut s = LabelStabilizer::default().with_history([2, 9]);
        assert_eq!(s.stabilize(21), 9);
    }

    #[test]
    fn test_collapse_runs_before_suppression() {
        // 0 collapses to idle == prev, so nothing is suppressed.
        let mut s = LabelStabilizer::default().with_history([9, 2]);
        assert_eq!(s.stabilize(0), 2);
    }

    #[test]
    fn test_stable_output_stays_stable() {
        let mut s = LabelStabilizer::default();
        let first = s.stabilize(17);
        let second = s.stabilize(17);
        assert_eq!(first, second);
        for _ in 0..50 {
            assert_eq!(s.stabilize(17), 17);
        }
    }

    #[test]
    fn test_history_bounded() {
        let mut s = LabelStabilizer::default();
        for i in 0..100 {
            s.stabilize([1, 4, 0, 9, 26][i % 5]);
            assert!(s.len() <= 20);
        }
        assert_eq!(s.len(), 20);
    }

    #[test]
    fn test_refine_disabled_passes_through() {
        let config = SmoothingConfig {
            refine_output: false,
            ..SmoothingConfig::default()
        };
        let mut s = LabelStabilizer::new(&config);
        assert_eq!(s.stabilize(7), 7);
        assert_eq!(s.stabilize(0), 0);
        assert_eq!(history_of(&s), vec![IDLE_CLASS]);
    }

    #[test]
    fn test_reset() {
        let mut s = LabelStabilizer::default();
        s.stabilize(12);
        s.stabilize(12);
        s.reset();
        assert_eq!(history_of(&s), vec![IDLE_CLASS]);
        assert_eq!(s.last(), IDLE_CLASS);
    }
}
