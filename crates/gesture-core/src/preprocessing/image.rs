//! Image preprocessing operations.
//!
//! This module provides:
//! - `resize_step`: Exact resize to target dimensions
//! - `scale_shorter_side_step`: Aspect-preserving rescale of the shorter edge
//! - `center_crop_step`: Center crop to target dimensions
//! - `to_tensor_step`: HWC u8 image to `[1, 3, H, W]` f32 tensor in `[0, 1]`
//! - `normalize_step`: Per-channel `(x - mean) / std`

use super::FrameData;
use crate::error::{GestureError, GestureResult};
use image::imageops::{self, FilterType};
use ndarray::{ArrayD, Axis, IxDyn};

const FILTER: FilterType = FilterType::Triangle;

fn expect_image(data: FrameData, step: &str) -> GestureResult<image::RgbImage> {
    match data {
        FrameData::Image(img) => Ok(img),
        FrameData::Tensor(_) => Err(GestureError::preprocessing(format!(
            "{} requires image input (got tensor)",
            step
        ))),
    }
}

fn expect_tensor(data: FrameData, step: &str) -> GestureResult<ArrayD<f32>> {
    match data {
        FrameData::Tensor(t) => Ok(t),
        FrameData::Image(_) => Err(GestureError::preprocessing(format!(
            "{} requires tensor input (got image)",
            step
        ))),
    }
}

/// Resize to exactly `width` x `height`, ignoring aspect ratio.
pub fn resize_step(data: FrameData, width: u32, height: u32) -> GestureResult<FrameData> {
    let img = expect_image(data, "Resize")?;
    if width == 0 || height == 0 {
        return Err(GestureError::preprocessing(format!(
            "Cannot resize to {}x{}",
            width, height
        )));
    }
    if img.dimensions() == (width, height) {
        return Ok(FrameData::Image(img));
    }
    Ok(FrameData::Image(imageops::resize(&img, width, height, FILTER)))
}

/// Rescale so the shorter edge equals `size`, keeping the aspect ratio.
pub fn scale_shorter_side_step(data: FrameData, size: u32) -> GestureResult<FrameData> {
    let img = expect_image(data, "ScaleShorterSide")?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || size == 0 {
        return Err(GestureError::preprocessing(format!(
            "Cannot scale {}x{} image to shorter side {}",
            w, h, size
        )));
    }
    if (w <= h && w == size) || (h <= w && h == size) {
        return Ok(FrameData::Image(img));
    }

    let (new_w, new_h) = if w < h {
        (size, scaled_edge(h, size, w))
    } else {
        (scaled_edge(w, size, h), size)
    };
    Ok(FrameData::Image(imageops::resize(&img, new_w, new_h, FILTER)))
}

/// `long * size / short`, truncated, never below 1.
fn scaled_edge(long: u32, size: u32, short: u32) -> u32 {
    ((u64::from(long) * u64::from(size)) / u64::from(short)).max(1) as u32
}

/// Center crop to `width` x `height`.
pub fn center_crop_step(data: FrameData, width: u32, height: u32) -> GestureResult<FrameData> {
    let img = expect_image(data, "CenterCrop")?;
    let (src_w, src_h) = img.dimensions();

    if width == 0 || height == 0 || height > src_h || width > src_w {
        return Err(GestureError::preprocessing(format!(
            "Cannot crop {}x{} from {}x{} image",
            width, height, src_w, src_h
        )));
    }

    let offset_w = (src_w - width) / 2;
    let offset_h = (src_h - height) / 2;
    let cropped = imageops::crop_imm(&img, offset_w, offset_h, width, height).to_image();
    Ok(FrameData::Image(cropped))
}

/// Convert to a `[1, 3, H, W]` tensor scaled to `[0, 1]`.
pub fn to_tensor_step(data: FrameData) -> GestureResult<FrameData> {
    let img = expect_image(data, "ToTensor")?;
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);

    let mut tensor = ArrayD::<f32>::zeros(IxDyn(&[1, 3, h, w]));
    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
        }
    }
    Ok(FrameData::Tensor(tensor))
}

/// Normalize each channel of a `[1, 3, H, W]` tensor.
pub fn normalize_step(data: FrameData, mean: &[f32; 3], std: &[f32; 3]) -> GestureResult<FrameData> {
    let mut tensor = expect_tensor(data, "Normalize")?;
    if tensor.ndim() != 4 || tensor.shape()[1] != 3 {
        return Err(GestureError::preprocessing(format!(
            "Normalize requires a [1, 3, H, W] tensor (got {:?})",
            tensor.shape()
        )));
    }
    for (c, mut channel) in tensor.axis_iter_mut(Axis(1)).enumerate() {
        let (m, s) = (mean[c], std[c]);
        channel.mapv_inplace(|v| (v - m) / s);
    }
    Ok(FrameData::Tensor(tensor))
}
