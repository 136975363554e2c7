//! Tensors exchanged between the stages of the frame loop.

use crate::error::{GestureError, GestureResult, InferenceError};
use ndarray::{Array1, ArrayD, ArrayView1, IxDyn};

/// One preprocessed frame, shape `[1, 3, H, W]`.
///
/// Produced once per processed frame and consumed by the invoker.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTensor(ArrayD<f32>);

impl FrameTensor {
    /// Wraps a tensor after checking it is a single 3-channel image.
    pub fn new(tensor: ArrayD<f32>) -> GestureResult<Self> {
        let shape = tensor.shape();
        if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 || shape[2] == 0 || shape[3] == 0 {
            return Err(GestureError::preprocessing(format!(
                "frame tensor must be [1, 3, H, W], got {:?}",
                shape
            )));
        }
        Ok(Self(tensor))
    }

    /// All-zero frame of the given edge lengths.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self(ArrayD::zeros(IxDyn(&[1, 3, height, width])))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn view(&self) -> &ArrayD<f32> {
        &self.0
    }

    pub fn into_inner(self) -> ArrayD<f32> {
        self.0
    }
}

/// Raw per-class scores from one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct LogitVector(Array1<f32>);

impl LogitVector {
    pub fn from_vec(values: Vec<f32>) -> Self {
        Self(Array1::from_vec(values))
    }

    /// Flattens a backend tensor (typically `[1, K]`) into K logits.
    pub fn from_tensor(tensor: ArrayD<f32>, num_classes: usize) -> Result<Self, InferenceError> {
        if tensor.len() != num_classes {
            return Err(InferenceError::LogitsLength {
                expected: num_classes,
                actual: tensor.len(),
            });
        }
        Ok(Self(tensor.iter().copied().collect()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.0.view()
    }

    pub fn as_array(&self) -> &Array1<f32> {
        &self.0
    }

    /// Index of the largest score (first one on ties).
    pub fn argmax(&self) -> Option<usize> {
        argmax(self.0.view())
    }

    /// Largest softmax probability.
    pub fn softmax_peak(&self) -> Option<f32> {
        let max = self.0.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !max.is_finite() {
            return None;
        }
        let denom: f32 = self.0.iter().map(|&v| (v - max).exp()).sum();
        (denom > 0.0).then(|| 1.0 / denom)
    }
}

/// First index attaining the maximum. NaN never wins.
pub(crate) fn argmax(values: ArrayView1<'_, f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
