//! Runtime Adapter module - the seam between the engine and an inference backend.
//!
//! The engine never loads or inspects a model itself. It talks to a backend
//! through [`InferenceSession`]: a named-input/named-output synchronous call
//! over `f32` tensors. Backends are responsible for:
//! - Loading the model artifact at startup
//! - Reporting their declared input/output names, in graph order
//! - Executing one call per frame
//!
//! # Module Organization
//!
//! - `onnx/` - ONNX Runtime backend (feature `onnx`, enabled by default)
//!
//! Tests use [`crate::testing::MockSession`] instead of a real model.

use ndarray::ArrayD;
use std::collections::HashMap;
use thiserror::Error;

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::{ExecutionProviderKind, ONNXSession};

/// Error type for runtime adapter operations.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// Result type for runtime adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Named tensors passed into or returned from a backend call.
pub type TensorMap = HashMap<String, ArrayD<f32>>;

/// Trait for running inference on a loaded model.
///
/// Abstracts the backend so the streaming engine can be driven by ONNX
/// Runtime in production and by scripted mocks in tests.
///
/// Name order matters: the engine binds the frame to the first input and the
/// recurrent state slots to the remaining inputs positionally, and reads the
/// outputs the same way.
pub trait InferenceSession: Send + Sync {
    /// Run inference with the given inputs.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Map of input names to tensor data
    ///
    /// # Returns
    ///
    /// Map of output names to tensor data
    fn run(&self, inputs: TensorMap) -> AdapterResult<TensorMap>;

    /// Get the names of input tensors, in graph order.
    fn input_names(&self) -> &[String];

    /// Get the names of output tensors, in graph order.
    fn output_names(&self) -> &[String];
}

impl<T: InferenceSession + ?Sized> InferenceSession for Box<T> {
    fn run(&self, inputs: TensorMap) -> AdapterResult<TensorMap> {
        (**self).run(inputs)
    }

    fn input_names(&self) -> &[String] {
        (**self).input_names()
    }

    fn output_names(&self) -> &[String] {
        (**self).output_names()
    }
}
