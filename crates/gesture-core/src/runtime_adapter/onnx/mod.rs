//! ONNX Runtime backend module.
//!
//! - `ONNXSession`: ONNX Runtime session wrapper implementing [`InferenceSession`](super::InferenceSession)
//! - `ExecutionProviderKind`: Execution provider selection (CPU, CoreML)

mod execution_provider;
mod session;

pub use execution_provider::ExecutionProviderKind;
#[cfg(feature = "coreml")]
pub use execution_provider::CoreMLComputeUnits;
pub use session::ONNXSession;
