//! Gesture Core - recurrent streaming inference for real-time gesture classification.
//!
//! A video stream is classified frame by frame by a recurrent model: every
//! call takes the frame plus ten "shift buffer" state tensors and returns the
//! logits plus the successor state. This crate owns the orchestration around
//! that call: keeping the recurrent state consistent across frames, smoothing
//! the noisy per-frame logits into a stable label, and skipping frames to
//! stay inside the latency budget.
//!
//! ## Quick Start
//!
//! Use the [`prelude`] module for common imports:
//!
//! ```rust,ignore
//! use gesture_core::prelude::*;
//!
//! let config = EngineConfig::from_file("engine.yaml")?;
//! let session = ONNXSession::new("pretrained/mobilenetv2_jester_online.onnx")?;
//! let pipeline = FramePipeline::from_config(&config.preprocessing);
//! let mut controller = StreamingController::from_session(session, pipeline, &config)?;
//!
//! for frame in camera_frames {
//!     match controller.step(&frame)? {
//!         FrameOutcome::Processed(p) => println!("{} ({:?} fps)", p.label, p.timing.frames_per_second()),
//!         other => println!("{}", other.label()),
//!     }
//! }
//! ```
//!
//! ## Module Organization
//!
//! ### Engine
//! - [`streaming`] - State store, invoker, averager, stabilizer and the frame loop
//! - [`categories`] - The 27-class gesture table
//!
//! ### Collaborators
//! - [`preprocessing`] - Raw image to model input tensor
//! - [`runtime_adapter`] - Backend seam and the ONNX Runtime session
//!
//! ### Support
//! - [`config`] - YAML/JSON engine configuration
//! - [`error`] - Error hierarchy
//! - [`timing`] - Per-stage frame timing
//!
//! ## Public vs Internal Modules
//!
//! Modules marked with `#[doc(hidden)]` are test support and may change
//! without notice.

// CoreML is Apple's ML framework and only exists on Apple platforms.
#[cfg(all(feature = "coreml", not(any(target_os = "macos", target_os = "ios"))))]
compile_error!(
    "Invalid feature combination: `coreml` requires macOS or iOS.\n\n\
    Solution: build with the default `onnx` feature (CPU execution provider) instead."
);

/// Common imports for gesture-core users.
pub mod prelude;

/// Error hierarchy: [`GestureError`](error::GestureError) at the top,
/// [`InferenceError`](error::InferenceError) for per-call failures.
pub mod error;
pub use error::{GestureError, GestureResult, InferenceError};

pub mod categories;
pub mod config;
pub mod preprocessing;
pub mod runtime_adapter;
pub mod streaming;
pub mod timing;

/// Mocks and fixtures for tests that should not need a model file.
#[doc(hidden)]
pub mod testing;
