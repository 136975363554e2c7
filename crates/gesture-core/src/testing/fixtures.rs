//! Test fixtures for common inputs and outputs.
//!
//! Provides pre-built tensors, names and images that can be used across
//! tests without requiring model files or a camera.

use crate::categories::NUM_CLASSES;
use crate::runtime_adapter::TensorMap;
use crate::streaming::{StateLayout, STATE_SLOT_COUNT};
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{ArrayD, IxDyn};

/// Peak value used by [`logits_peaking_at`].
pub const PEAK_LOGIT: f32 = 10.0;

/// Input and output names of the exported Jester model, in graph order.
pub fn jester_io_names() -> (Vec<String>, Vec<String>) {
    let inputs = std::iter::once("input".to_string())
        .chain((0..STATE_SLOT_COUNT).map(|i| format!("shift_in_{}", i)))
        .collect();
    let outputs = std::iter::once("logits".to_string())
        .chain((0..STATE_SLOT_COUNT).map(|i| format!("shift_out_{}", i)))
        .collect();
    (inputs, outputs)
}

/// A full cold-start input map for the Jester names.
pub fn jester_inputs() -> TensorMap {
    let (names, _) = jester_io_names();
    let state = StateLayout::default().zeros();
    let mut inputs = TensorMap::new();
    inputs.insert(names[0].clone(), zero_frame_tensor(224));
    for (name, slot) in names[1..].iter().zip(state.iter()) {
        inputs.insert(name.clone(), slot.clone());
    }
    inputs
}

/// Create a sample logits tensor for classification.
///
/// Returns a tensor of shape [1, num_classes] with uniform distribution.
pub fn sample_logits(num_classes: usize) -> ArrayD<f32> {
    let value = 1.0 / num_classes as f32;
    ArrayD::from_elem(IxDyn(&[1, num_classes]), value)
}

/// `[1, 27]` logits, zero except [`PEAK_LOGIT`] at `index`.
pub fn logits_peaking_at(index: usize) -> ArrayD<f32> {
    let mut logits = ArrayD::<f32>::zeros(IxDyn(&[1, NUM_CLASSES]));
    logits[[0, index]] = PEAK_LOGIT;
    logits
}

/// `[1, 27]` logits whose arg-max is `index` by a hair (low confidence).
pub fn flat_logits_with_edge_at(index: usize) -> ArrayD<f32> {
    let mut logits = ArrayD::<f32>::zeros(IxDyn(&[1, NUM_CLASSES]));
    logits[[0, index]] = 0.1;
    logits
}

/// Zero `[1, 3, edge, edge]` tensor.
pub fn zero_frame_tensor(edge: usize) -> ArrayD<f32> {
    ArrayD::zeros(IxDyn(&[1, 3, edge, edge]))
}

/// Solid-color RGB frame.
pub fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
}
