//! ONNX Runtime session wrapper.
//!
//! Loads the recurrent gesture model once at startup, records its declared
//! input/output names in graph order, and runs one synchronous call per
//! processed frame. Tensors cross the boundary as `(shape, Vec<f32>)` so the
//! engine's `ndarray` types stay independent of the runtime's.
//!
//! # Example
//!
//! ```rust,no_run
//! use gesture_core::runtime_adapter::{ExecutionProviderKind, InferenceSession, ONNXSession};
//!
//! let session = ONNXSession::with_provider(
//!     "pretrained/mobilenetv2_jester_online.onnx",
//!     ExecutionProviderKind::Cpu,
//! )?;
//! assert_eq!(session.input_names().len(), 11);
//! # Ok::<(), gesture_core::runtime_adapter::AdapterError>(())
//! ```

use super::execution_provider::ExecutionProviderKind;
use crate::runtime_adapter::{AdapterError, AdapterResult, InferenceSession, TensorMap};
use ndarray::{ArrayD, IxDyn};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

/// ONNX Runtime session wrapper.
pub struct ONNXSession {
    /// The ONNX Runtime session (`run` needs `&mut Session`)
    session: Mutex<Session>,
    /// Input names from the model, in graph order
    input_names: Vec<String>,
    /// Output names from the model, in graph order
    output_names: Vec<String>,
    /// The execution provider used for this session
    execution_provider: ExecutionProviderKind,
}

impl ONNXSession {
    /// Creates a CPU session from a model file.
    pub fn new(model_path: impl AsRef<Path>) -> AdapterResult<Self> {
        Self::with_provider(model_path, ExecutionProviderKind::Cpu)
    }

    /// Creates a new ONNX session with the specified execution provider.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Model file doesn't exist
    /// - Model loading fails
    /// - Execution provider initialization fails
    pub fn with_provider(
        model_path: impl AsRef<Path>,
        execution_provider: ExecutionProviderKind,
    ) -> AdapterResult<Self> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(AdapterError::ModelNotFound(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        // Singleton environment, safe to call more than once
        let _ = ort::init().commit();

        let mut builder = Session::builder()
            .map_err(|e| {
                AdapterError::RuntimeError(format!("Failed to create session builder: {}", e))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                AdapterError::RuntimeError(format!("Failed to set optimization level: {}", e))
            })?;

        builder = Self::configure_execution_provider(builder, &execution_provider)?;

        let session = builder.commit_from_file(path).map_err(|e| {
            AdapterError::RuntimeError(format!("Failed to load ONNX model: {}", e))
        })?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();

        log::info!(
            "Created ONNX session with {} execution provider for model: {} ({} inputs, {} outputs)",
            execution_provider,
            path.display(),
            input_names.len(),
            output_names.len()
        );
        log::debug!("Model inputs: {:?}", input_names);
        log::debug!("Model outputs: {:?}", output_names);

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
            execution_provider,
        })
    }

    /// Configures the execution provider on the session builder.
    fn configure_execution_provider(
        builder: ort::session::builder::SessionBuilder,
        provider: &ExecutionProviderKind,
    ) -> AdapterResult<ort::session::builder::SessionBuilder> {
        match provider {
            ExecutionProviderKind::Cpu => Ok(builder),

            #[cfg(feature = "coreml")]
            ExecutionProviderKind::CoreML(units) => {
                use super::execution_provider::CoreMLComputeUnits;
                use ort::ep;

                let coreml_ep = ep::CoreML::default()
                    .with_compute_units(match units {
                        CoreMLComputeUnits::CpuOnly => ep::coreml::ComputeUnits::CPUOnly,
                        CoreMLComputeUnits::CpuAndGpu => ep::coreml::ComputeUnits::CPUAndGPU,
                        CoreMLComputeUnits::CpuAndNeuralEngine => {
                            ep::coreml::ComputeUnits::CPUAndNeuralEngine
                        }
                        CoreMLComputeUnits::All => ep::coreml::ComputeUnits::All,
                    })
                    .build();

                log::debug!("Configuring CoreML execution provider: {}", units);

                builder.with_execution_providers([coreml_ep]).map_err(|e| {
                    AdapterError::RuntimeError(format!(
                        "Failed to configure CoreML execution provider: {}",
                        e
                    ))
                })
            }
        }
    }

    /// Returns the execution provider used for this session.
    pub fn execution_provider(&self) -> &ExecutionProviderKind {
        &self.execution_provider
    }
}

impl InferenceSession for ONNXSession {
    fn run(&self, inputs: TensorMap) -> AdapterResult<TensorMap> {
        use ort::session::{SessionInputValue, SessionInputs};

        let mut ort_inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(inputs.len());
        for (name, array) in inputs {
            let dims = array.shape().to_vec();
            let data: Vec<f32> = array.iter().copied().collect();
            let tensor = Tensor::<f32>::from_array((dims, data)).map_err(|e| {
                AdapterError::InvalidInput(format!("Failed to convert tensor '{}': {}", name, e))
            })?;
            ort_inputs.push((Cow::Owned(name), tensor.into_dyn().into()));
        }

        let mut session_guard = self
            .session
            .lock()
            .map_err(|e| AdapterError::RuntimeError(format!("Failed to lock session: {}", e)))?;

        let outputs = session_guard
            .run(SessionInputs::from(ort_inputs))
            .map_err(|e| {
                AdapterError::InferenceFailed(format!("ONNX Runtime inference failed: {}", e))
            })?;

        let mut result = TensorMap::with_capacity(self.output_names.len());
        for output_name in &self.output_names {
            let value = outputs.get(output_name.as_str()).ok_or_else(|| {
                AdapterError::InferenceFailed(format!("Output '{}' not produced", output_name))
            })?;
            let (shape, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                AdapterError::RuntimeError(format!(
                    "Failed to extract output '{}' as f32: {}",
                    output_name, e
                ))
            })?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            let array = ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|e| {
                AdapterError::RuntimeError(format!(
                    "Failed to convert output '{}' to ArrayD: {}",
                    output_name, e
                ))
            })?;
            result.insert(output_name.clone(), array);
        }

        Ok(result)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
