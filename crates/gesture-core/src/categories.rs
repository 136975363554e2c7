//! Gesture category table.
//!
//! The 27 classes of the Jester gesture set, in the order the model emits
//! its logits. The table only matters at the presentation boundary; the
//! engine's decisions work on plain indices.

use crate::error::GestureError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of gesture classes (logits per inference call).
pub const NUM_CLASSES: usize = 27;

/// Human-readable category names, indexed by class.
pub const CATEGORIES: [&str; NUM_CLASSES] = [
    "Doing other things",
    "Drumming Fingers",
    "No gesture",
    "Pulling Hand In",
    "Pulling Two Fingers In",
    "Pushing Hand Away",
    "Pushing Two Fingers Away",
    "Rolling Hand Backward",
    "Rolling Hand Forward",
    "Shaking Hand",
    "Sliding Two Fingers Down",
    "Sliding Two Fingers Left",
    "Sliding Two Fingers Right",
    "Sliding Two Fingers Up",
    "Stop Sign",
    "Swiping Down",
    "Swiping Left",
    "Swiping Right",
    "Swiping Up",
    "Thumb Down",
    "Thumb Up",
    "Turning Hand Clockwise",
    "Turning Hand Counterclockwise",
    "Zooming In With Full Hand",
    "Zooming In With Two Fingers",
    "Zooming Out With Full Hand",
    "Zooming Out With Two Fingers",
];

/// "Doing other things": collapsed into [`IDLE_CLASS`] by the stabilizer.
pub const OTHER_CLASS: usize = 0;

/// "No gesture": the idle label the stream starts in.
pub const IDLE_CLASS: usize = 2;

/// Classes too easily confused with motion noise to trust on one window.
pub const MASKED_CLASSES: [usize; 5] = [3, 7, 8, 21, 22];

/// A class index from the category table.
///
/// Serializes as the bare index; deserializing rejects indices outside the
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct GestureLabel(usize);

impl GestureLabel {
    /// The idle/no-gesture label.
    pub const IDLE: GestureLabel = GestureLabel(IDLE_CLASS);

    /// Bounds-checked constructor.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < NUM_CLASSES).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn name(self) -> &'static str {
        CATEGORIES[self.0]
    }

    pub fn is_idle(self) -> bool {
        self.0 == IDLE_CLASS
    }

    /// Whether the label is one of the default masked transient classes.
    pub fn is_masked(self) -> bool {
        MASKED_CLASSES.contains(&self.0)
    }

    /// Iterates over every label in table order.
    pub fn all() -> impl Iterator<Item = GestureLabel> {
        (0..NUM_CLASSES).map(GestureLabel)
    }
}

impl Default for GestureLabel {
    fn default() -> Self {
        Self::IDLE
    }
}

impl TryFrom<usize> for GestureLabel {
    type Error = GestureError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::from_index(index).ok_or_else(|| {
            GestureError::config(format!(
                "Gesture class {} out of range (0..{})",
                index, NUM_CLASSES
            ))
        })
    }
}

impl From<GestureLabel> for usize {
    fn from(label: GestureLabel) -> usize {
        label.0
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_anchors() {
        assert_eq!(CATEGORIES[OTHER_CLASS], "Doing other things");
        assert_eq!(CATEGORIES[IDLE_CLASS], "No gesture");
        assert_eq!(CATEGORIES[26], "Zooming Out With Two Fingers");
    }

    #[test]
    fn test_from_index_bounds() {
        assert_eq!(GestureLabel::from_index(20).map(|l| l.name()), Some("Thumb Up"));
        assert!(GestureLabel::from_index(NUM_CLASSES).is_none());
    }

    #[test]
    fn test_masked_and_idle() {
        assert!(GestureLabel::default().is_idle());
        assert!(GestureLabel::from_index(21).unwrap().is_masked());
        assert!(!GestureLabel::from_index(9).unwrap().is_masked());
        assert_eq!(GestureLabel::all().count(), NUM_CLASSES);
    }

    #[test]
    fn test_serde_uses_bare_index() {
        let label = GestureLabel::from_index(20).unwrap();
        assert_eq!(serde_json::to_string(&label).unwrap(), "20");
        let back: GestureLabel = serde_json::from_str("20").unwrap();
        assert_eq!(back, label);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_index() {
        assert!(serde_json::from_str::<GestureLabel>("99").is_err());
        assert!(serde_json::from_str::<GestureLabel>("27").is_err());
        assert!(GestureLabel::try_from(99usize).is_err());
    }
}
