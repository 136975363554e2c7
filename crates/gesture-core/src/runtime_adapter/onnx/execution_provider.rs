//! Execution Provider configuration for ONNX Runtime.
//!
//! | Provider | Platform | Hardware | Feature Flag |
//! |----------|----------|----------|--------------|
//! | CPU | All | CPU | (default) |
//! | CoreML | macOS/iOS | Neural Engine, GPU, CPU | `coreml` |
//!
//! If the selected provider is unavailable, ONNX Runtime falls back to CPU.

use std::fmt;
use std::str::FromStr;

use super::super::AdapterError;

/// Execution provider selection for ONNX Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionProviderKind {
    /// CPU execution (default, always available)
    #[default]
    Cpu,

    /// CoreML execution provider (macOS/iOS only)
    #[cfg(feature = "coreml")]
    CoreML(CoreMLComputeUnits),
}

impl fmt::Display for ExecutionProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            #[cfg(feature = "coreml")]
            Self::CoreML(units) => write!(f, "coreml-{}", units),
        }
    }
}

impl FromStr for ExecutionProviderKind {
    type Err = AdapterError;

    /// Parses `cpu`, and with the `coreml` feature `coreml`, `coreml-ane`,
    /// `coreml-gpu`, `coreml-cpu`, `coreml-all`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            #[cfg(feature = "coreml")]
            "coreml" | "coreml-ane" => Ok(Self::CoreML(CoreMLComputeUnits::CpuAndNeuralEngine)),
            #[cfg(feature = "coreml")]
            "coreml-gpu" => Ok(Self::CoreML(CoreMLComputeUnits::CpuAndGpu)),
            #[cfg(feature = "coreml")]
            "coreml-cpu" => Ok(Self::CoreML(CoreMLComputeUnits::CpuOnly)),
            #[cfg(feature = "coreml")]
            "coreml-all" => Ok(Self::CoreML(CoreMLComputeUnits::All)),
            other => Err(AdapterError::RuntimeError(format!(
                "Unknown execution provider '{}'",
                other
            ))),
        }
    }
}

/// CoreML compute unit selection.
#[cfg(feature = "coreml")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoreMLComputeUnits {
    /// CPU only - no hardware acceleration.
    CpuOnly,
    /// CPU and GPU acceleration.
    CpuAndGpu,
    /// CPU and Neural Engine acceleration (recommended).
    #[default]
    CpuAndNeuralEngine,
    /// Let CoreML decide.
    All,
}

#[cfg(feature = "coreml")]
impl fmt::Display for CoreMLComputeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CpuOnly => write!(f, "cpu"),
            Self::CpuAndGpu => write!(f, "gpu"),
            Self::CpuAndNeuralEngine => write!(f, "ane"),
            Self::All => write!(f, "all"),
        }
    }
}
