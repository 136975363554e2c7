//! Testing utilities for gesture-core.
//!
//! This module provides mocks, fixtures, and test helpers for unit testing
//! without requiring real model files or a frame source.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gesture_core::testing::{fixtures, MockPreprocessor, MockSession, RecordingPresenter};
//!
//! // A backend that always predicts "Stop Sign"
//! let session = MockSession::jester().with_logits(fixtures::logits_peaking_at(14));
//!
//! let mut controller = StreamingController::from_session(
//!     session,
//!     MockPreprocessor::default(),
//!     &EngineConfig::default(),
//! )?;
//! let mut presenter = RecordingPresenter::new();
//! controller.run(vec![Some(0.0); 8], &mut presenter)?;
//! ```

pub mod fixtures;
pub mod mocks;

pub use mocks::*;
