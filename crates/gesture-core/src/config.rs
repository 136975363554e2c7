//! Engine configuration.
//!
//! Every section has defaults matching the shipped Jester MobileNetV2 online
//! model, so an empty file (or no file) is a valid configuration. Files are
//! loaded from YAML (`.yaml`/`.yml`) or JSON (`.json`).
//!
//! ```yaml
//! model:
//!   path: pretrained/mobilenetv2_jester_online.onnx
//! smoothing:
//!   logit_window: 12
//!   min_confidence: 0.4
//! stream:
//!   frame_stride: 2
//! ```

use crate::categories::{IDLE_CLASS, MASKED_CLASSES, NUM_CLASSES, OTHER_CLASS};
use crate::error::{GestureError, GestureResult};
use crate::streaming::{DEFAULT_LABEL_HISTORY, DEFAULT_LOGIT_WINDOW, STATE_SLOT_COUNT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub model: ModelConfig,
    pub state: StateConfig,
    pub smoothing: SmoothingConfig,
    pub stream: StreamConfig,
    pub preprocessing: PreprocessingConfig,
}

/// Model artifact and I/O contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model (may also be given on the command line)
    pub path: Option<PathBuf>,
    /// Length of the logits vector
    pub num_classes: usize,
    /// Explicit tensor names. When absent, names are taken from the model in
    /// graph order.
    pub binding: Option<BindingNames>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            num_classes: NUM_CLASSES,
            binding: None,
        }
    }
}

/// Explicit backend tensor names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingNames {
    pub frame_input: String,
    pub state_inputs: Vec<String>,
    pub logits_output: String,
    pub state_outputs: Vec<String>,
}

/// Recurrent state layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Shape of each recurrent slot, in backend input order
    pub slot_shapes: Vec<Vec<usize>>,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            slot_shapes: vec![
                vec![1, 3, 56, 56],
                vec![1, 4, 28, 28],
                vec![1, 4, 28, 28],
                vec![1, 8, 14, 14],
                vec![1, 8, 14, 14],
                vec![1, 8, 14, 14],
                vec![1, 12, 14, 14],
                vec![1, 12, 14, 14],
                vec![1, 20, 7, 7],
                vec![1, 20, 7, 7],
            ],
        }
    }
}

/// Two-stage prediction smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Number of recent logit vectors summed before the arg-max (1 disables averaging)
    pub logit_window: usize,
    /// Capacity of the stable label history
    pub label_history: usize,
    /// Apply masking, idle collapsing and flicker suppression
    pub refine_output: bool,
    /// The idle/no-gesture class
    pub idle_class: usize,
    /// The "doing other things" class collapsed into idle
    pub other_class: usize,
    /// Transient classes replaced by the previous label
    pub masked_classes: Vec<usize>,
    /// Minimum softmax peak of the current frame's logits; below it the
    /// previous stable label is kept. `None` disables the gate.
    pub min_confidence: Option<f32>,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            logit_window: DEFAULT_LOGIT_WINDOW,
            label_history: DEFAULT_LABEL_HISTORY,
            refine_output: true,
            idle_class: IDLE_CLASS,
            other_class: OTHER_CLASS,
            masked_classes: MASKED_CLASSES.to_vec(),
            min_confidence: None,
        }
    }
}

/// Frame loop policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Process every `frame_stride`-th frame; the rest reuse the last label
    pub frame_stride: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { frame_stride: 2 }
    }
}

/// Preprocessing pipeline selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePreset {
    /// Scale shorter side, center crop, to tensor, ImageNet normalization
    #[default]
    Jester,
    /// Plain resize to the input size, to tensor in [0, 1]
    Simple,
}

impl std::str::FromStr for PipelinePreset {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jester" => Ok(Self::Jester),
            "simple" => Ok(Self::Simple),
            other => Err(GestureError::config(format!(
                "Unknown preprocessing preset '{}' (expected 'jester' or 'simple')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub preset: PipelinePreset,
    /// Square model input edge
    pub input_size: u32,
    /// Shorter-side target before cropping (jester preset)
    pub scale_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            preset: PipelinePreset::Jester,
            input_size: 224,
            scale_size: 256,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl PreprocessingConfig {
    /// Shape of the tensor handed to the backend.
    pub fn frame_shape(&self) -> [usize; 4] {
        let edge = self.input_size as usize;
        [1, 3, edge, edge]
    }
}

impl EngineConfig {
    /// Load a configuration file, picking the format from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> GestureResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            other => {
                return Err(GestureError::config(format!(
                    "Unsupported config extension {:?} for {}",
                    other,
                    path.display()
                )))
            }
        };
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> GestureResult<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> GestureResult<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_json::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> GestureResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> GestureResult<()> {
        let classes = self.model.num_classes;
        if classes != NUM_CLASSES {
            return Err(GestureError::config(format!(
                "model.num_classes is {}, but the category table has {} entries",
                classes, NUM_CLASSES
            )));
        }

        if self.state.slot_shapes.len() != STATE_SLOT_COUNT {
            return Err(GestureError::config(format!(
                "state.slot_shapes must list {} slots, got {}",
                STATE_SLOT_COUNT,
                self.state.slot_shapes.len()
            )));
        }
        for (slot, shape) in self.state.slot_shapes.iter().enumerate() {
            if shape.len() != 4 || shape[0] != 1 || shape.iter().any(|&d| d == 0) {
                return Err(GestureError::config(format!(
                    "state slot {} must be a non-empty [1, C, H, W] shape, got {:?}",
                    slot, shape
                )));
            }
        }

        if let Some(binding) = &self.model.binding {
            if binding.state_inputs.len() != STATE_SLOT_COUNT
                || binding.state_outputs.len() != STATE_SLOT_COUNT
            {
                return Err(GestureError::config(format!(
                    "model.binding must name {} state inputs and outputs",
                    STATE_SLOT_COUNT
                )));
            }
        }

        let s = &self.smoothing;
        if s.logit_window == 0 {
            return Err(GestureError::config("smoothing.logit_window must be at least 1"));
        }
        if s.label_history < 2 {
            return Err(GestureError::config("smoothing.label_history must be at least 2"));
        }
        for (what, class) in [("idle_class", s.idle_class), ("other_class", s.other_class)] {
            if class >= classes {
                return Err(GestureError::config(format!(
                    "smoothing.{} {} is out of range for {} classes",
                    what, class, classes
                )));
            }
        }
        if let Some(bad) = s.masked_classes.iter().find(|&&c| c >= classes) {
            return Err(GestureError::config(format!(
                "smoothing.masked_classes contains {} (only {} classes)",
                bad, classes
            )));
        }
        if s.masked_classes.contains(&s.idle_class) {
            return Err(GestureError::config("the idle class cannot be masked"));
        }
        if let Some(threshold) = s.min_confidence {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(GestureError::config(format!(
                    "smoothing.min_confidence must be within [0, 1], got {}",
                    threshold
                )));
            }
        }

        if self.stream.frame_stride == 0 {
            return Err(GestureError::config("stream.frame_stride must be at least 1"));
        }

        let p = &self.preprocessing;
        if p.input_size == 0 {
            return Err(GestureError::config("preprocessing.input_size must be positive"));
        }
        if p.preset == PipelinePreset::Jester && p.scale_size < p.input_size {
            return Err(GestureError::config(format!(
                "preprocessing.scale_size {} is smaller than input_size {}",
                p.scale_size, p.input_size
            )));
        }
        if p.std.iter().any(|&v| v <= 0.0) {
            return Err(GestureError::config("preprocessing.std values must be positive"));
        }

        Ok(())
    }
}
