//! Preprocessing module - raw frame to model input tensor.
//!
//! A [`FramePipeline`] is an ordered list of pure [`Transform`] steps run
//! once per processed frame. Steps pass a [`FrameData`] along: image steps
//! come first, `ToTensor` switches to tensor form, tensor steps follow.
//!
//! | Preset | Steps |
//! |--------|-------|
//! | [`FramePipeline::jester`] | ScaleShorterSide(256) → CenterCrop(224) → ToTensor → Normalize(ImageNet) |
//! | [`FramePipeline::simple`] | Resize(224, 224) → ToTensor |

pub mod image;

use crate::config::{PipelinePreset, PreprocessingConfig};
use crate::error::{GestureError, GestureResult};
use crate::streaming::{FrameTensor, Preprocessor};
use ::image::{DynamicImage, RgbImage};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// ImageNet channel means.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Intermediate value passed between steps.
#[derive(Debug, Clone)]
pub enum FrameData {
    Image(RgbImage),
    Tensor(ArrayD<f32>),
}

/// One preprocessing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Transform {
    Resize { width: u32, height: u32 },
    ScaleShorterSide { size: u32 },
    CenterCrop { width: u32, height: u32 },
    ToTensor,
    Normalize { mean: [f32; 3], std: [f32; 3] },
}

impl Transform {
    fn apply(&self, data: FrameData) -> GestureResult<FrameData> {
        match self {
            Transform::Resize { width, height } => image::resize_step(data, *width, *height),
            Transform::ScaleShorterSide { size } => image::scale_shorter_side_step(data, *size),
            Transform::CenterCrop { width, height } => {
                image::center_crop_step(data, *width, *height)
            }
            Transform::ToTensor => image::to_tensor_step(data),
            Transform::Normalize { mean, std } => image::normalize_step(data, mean, std),
        }
    }
}

/// Ordered preprocessing steps plus the expected output shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePipeline {
    steps: Vec<Transform>,
    output_shape: Option<[usize; 4]>,
}

impl FramePipeline {
    pub fn new(steps: Vec<Transform>) -> Self {
        Self {
            steps,
            output_shape: None,
        }
    }

    /// The pipeline the Jester MobileNetV2 model was trained with.
    pub fn jester() -> Self {
        Self::from_config(&PreprocessingConfig::default())
    }

    /// Plain resize to `size` x `size`, values in `[0, 1]`.
    pub fn simple(size: u32) -> Self {
        Self::from_config(&PreprocessingConfig {
            preset: PipelinePreset::Simple,
            input_size: size,
            ..PreprocessingConfig::default()
        })
    }

    pub fn from_config(config: &PreprocessingConfig) -> Self {
        let size = config.input_size;
        let steps = match config.preset {
            PipelinePreset::Jester => vec![
                Transform::ScaleShorterSide {
                    size: config.scale_size,
                },
                Transform::CenterCrop {
                    width: size,
                    height: size,
                },
                Transform::ToTensor,
                Transform::Normalize {
                    mean: config.mean,
                    std: config.std,
                },
            ],
            PipelinePreset::Simple => vec![
                Transform::Resize {
                    width: size,
                    height: size,
                },
                Transform::ToTensor,
            ],
        };
        Self::new(steps).with_output_shape(config.frame_shape())
    }

    /// Require every output to have exactly this shape.
    pub fn with_output_shape(mut self, shape: [usize; 4]) -> Self {
        self.output_shape = Some(shape);
        self
    }

    pub fn steps(&self) -> &[Transform] {
        &self.steps
    }

    pub fn output_shape(&self) -> Option<[usize; 4]> {
        self.output_shape
    }

    /// Runs every step over `frame`.
    pub fn run(&self, frame: &DynamicImage) -> GestureResult<FrameTensor> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(GestureError::preprocessing("empty frame"));
        }

        let mut data = FrameData::Image(frame.to_rgb8());
        for step in &self.steps {
            data = step.apply(data)?;
        }

        let tensor = match data {
            FrameData::Tensor(t) => FrameTensor::new(t)?,
            FrameData::Image(_) => {
                return Err(GestureError::preprocessing(
                    "pipeline ended without a ToTensor step",
                ))
            }
        };

        if let Some(expected) = self.output_shape {
            if tensor.shape() != expected.as_slice() {
                return Err(GestureError::preprocessing(format!(
                    "pipeline produced {:?}, model expects {:?}",
                    tensor.shape(),
                    expected
                )));
            }
        }
        Ok(tensor)
    }
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::jester()
    }
}

impl Preprocessor for FramePipeline {
    type Frame = DynamicImage;

    fn preprocess(&self, frame: &DynamicImage) -> GestureResult<FrameTensor> {
        self.run(frame)
    }
}
