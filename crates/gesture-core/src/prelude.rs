//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust,ignore
//! use gesture_core::prelude::*;
//!
//! let config = EngineConfig::default();
//! let pipeline = FramePipeline::from_config(&config.preprocessing);
//! ```
//!
//! # What's Included
//!
//! ## Engine
//! - [`StreamingController`], [`FrameOutcome`], [`ProcessedFrame`], [`StreamSummary`]
//! - [`Preprocessor`], [`Presenter`] - Collaborator traits
//! - [`GestureLabel`] - Stable label with its category name
//!
//! ## Collaborators
//! - [`FramePipeline`] - Image preprocessing
//! - [`InferenceSession`] - Backend trait, [`ONNXSession`] with the `onnx` feature
//!
//! ## Errors & Config
//! - [`GestureError`], [`GestureResult`]
//! - [`EngineConfig`]

// ============================================================================
// Engine
// ============================================================================

pub use crate::categories::GestureLabel;
pub use crate::streaming::{
    FrameOutcome, FrameTensor, Preprocessor, Presenter, ProcessedFrame, StreamSummary,
    StreamingController,
};
pub use crate::timing::FrameTiming;

// ============================================================================
// Collaborators
// ============================================================================

pub use crate::preprocessing::FramePipeline;
pub use crate::runtime_adapter::InferenceSession;

#[cfg(feature = "onnx")]
pub use crate::runtime_adapter::ONNXSession;

// ============================================================================
// Errors & Configuration
// ============================================================================

pub use crate::config::EngineConfig;
pub use crate::error::{GestureError, GestureResult};
