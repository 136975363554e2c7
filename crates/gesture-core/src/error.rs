//! Unified error types for gesture-core public API.
//!
//! Internal modules may use their own error types (the backend seam uses
//! [`AdapterError`](crate::runtime_adapter::AdapterError)), but convert to
//! `GestureError` at module boundaries.
//!
//! # Error Hierarchy
//!
//! ```text
//! GestureError
//! ├── Inference(InferenceError)  -- Backend call failed (frame dropped)
//! ├── Preprocessing(String)      -- Frame could not be turned into a tensor (frame dropped)
//! ├── StateShape { .. }          -- Recurrent state contract broken (fatal)
//! ├── Config(String)             -- Configuration errors (fatal)
//! ├── Io(std::io::Error)         -- I/O errors
//! └── Serialization(String)      -- JSON/YAML parsing errors
//! ```
//!
//! Per-frame failures are recoverable: the controller drops the frame and
//! re-emits the previous label. [`GestureError::is_fatal`] identifies the
//! errors that must stop the stream.

use thiserror::Error;

/// The canonical error type for gesture-core public API.
#[derive(Error, Debug)]
pub enum GestureError {
    /// Backend invocation failed
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Raw frame could not be preprocessed
    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    /// The backend produced a recurrent state that does not match the declared layout
    #[error("Recurrent state slot {slot} changed shape: expected {expected:?}, got {actual:?}")]
    StateShape {
        /// Position of the offending slot (0..10)
        slot: usize,
        /// Shape fixed at construction
        expected: Vec<usize>,
        /// Shape returned by the backend
        actual: Vec<usize>,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error (JSON, YAML)
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised around a single backend call.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Invalid input data format or shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend-specific error (ONNX Runtime, mock, ...)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend did not return an output the binding expects
    #[error("Missing output '{0}'")]
    MissingOutput(String),

    /// Logits tensor has the wrong number of classes
    #[error("Logits have {actual} classes, expected {expected}")]
    LogitsLength {
        /// Configured class count
        expected: usize,
        /// Element count of the returned tensor
        actual: usize,
    },
}

/// Result type alias for gesture-core.
pub type GestureResult<T> = Result<T, GestureError>;

// ─────────────────────────────────────────────────────────────────────────────
// Conversions from internal errors
// ─────────────────────────────────────────────────────────────────────────────

impl From<crate::runtime_adapter::AdapterError> for GestureError {
    fn from(e: crate::runtime_adapter::AdapterError) -> Self {
        use crate::runtime_adapter::AdapterError;
        match e {
            AdapterError::ModelNotFound(s) => GestureError::Config(s),
            AdapterError::InvalidInput(s) => InferenceError::invalid_input(s).into(),
            AdapterError::InferenceFailed(s) => InferenceError::backend(s).into(),
            AdapterError::IOError(e) => GestureError::Io(e),
            AdapterError::RuntimeError(s) => InferenceError::backend(s).into(),
        }
    }
}

impl From<serde_json::Error> for GestureError {
    fn from(e: serde_json::Error) -> Self {
        GestureError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for GestureError {
    fn from(e: serde_yaml::Error) -> Self {
        GestureError::Serialization(e.to_string())
    }
}

impl From<image::ImageError> for GestureError {
    fn from(e: image::ImageError) -> Self {
        GestureError::Preprocessing(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Convenience constructors
// ─────────────────────────────────────────────────────────────────────────────

impl GestureError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        GestureError::Config(msg.into())
    }

    /// Create a preprocessing error.
    pub fn preprocessing(msg: impl Into<String>) -> Self {
        GestureError::Preprocessing(msg.into())
    }

    /// Whether the stream must stop.
    ///
    /// Inference and preprocessing failures only cost one frame; everything
    /// else means the engine can no longer trust its own state.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GestureError::Inference(_) | GestureError::Preprocessing(_)
        )
    }
}

impl InferenceError {
    /// Create an "invalid input" error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        InferenceError::InvalidInput(msg.into())
    }

    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        InferenceError::Backend(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_error_display() {
        let err = GestureError::Config("missing model path".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing model path");
    }

    #[test]
    fn test_state_shape_display() {
        let err = GestureError::StateShape {
            slot: 3,
            expected: vec![1, 8, 14, 14],
            actual: vec![1, 8, 7, 7],
        };
        assert_eq!(
            err.to_string(),
            "Recurrent state slot 3 changed shape: expected [1, 8, 14, 14], got [1, 8, 7, 7]"
        );
    }

    #[test]
    fn test_fatality() {
        assert!(!GestureError::Inference(InferenceError::backend("boom")).is_fatal());
        assert!(!GestureError::preprocessing("empty image").is_fatal());
        assert!(GestureError::config("bad").is_fatal());
        assert!(GestureError::StateShape {
            slot: 0,
            expected: vec![1],
            actual: vec![2],
        }
        .is_fatal());
    }

    #[test]
    fn test_adapter_error_conversion() {
        use crate::runtime_adapter::AdapterError;

        let err: GestureError = AdapterError::InferenceFailed("ORT error".to_string()).into();
        assert!(matches!(
            err,
            GestureError::Inference(InferenceError::Backend(_))
        ));

        let err: GestureError =
            AdapterError::InvalidInput("missing input 'input'".to_string()).into();
        assert!(matches!(
            err,
            GestureError::Inference(InferenceError::InvalidInput(_))
        ));
        assert!(!err.is_fatal());

        let err: GestureError = AdapterError::ModelNotFound("model.onnx".to_string()).into();
        assert!(matches!(err, GestureError::Config(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("invalid json {");
        let err: GestureError = result.unwrap_err().into();
        assert!(matches!(err, GestureError::Serialization(_)));
    }
}
