//! `gesture run` - classify a directory of frames.
//!
//! The directory stands in for a camera: its images are read in file-name
//! order and fed to the streaming controller one by one. Decoding happens
//! inside the preprocessing stage, so an unreadable file costs one dropped
//! frame instead of the whole run.

use super::utils::{format_fps, format_micros, list_frame_files};
use anyhow::{bail, Context, Result};
use colored::*;
use gesture_core::categories::GestureLabel;
use gesture_core::config::{EngineConfig, PipelinePreset};
use gesture_core::preprocessing::FramePipeline;
use gesture_core::runtime_adapter::{ExecutionProviderKind, ONNXSession};
use gesture_core::streaming::{
    FrameTensor, Preprocessor, Presenter, ProcessedFrame, StreamSummary, StreamingController,
};
use gesture_core::timing::Stage;
use gesture_core::{GestureError, GestureResult};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Options for `gesture run`, after argument parsing.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub model: Option<PathBuf>,
    pub frames: PathBuf,
    pub config: Option<PathBuf>,
    pub stride: Option<u64>,
    pub max_frames: Option<u64>,
    pub pipeline: Option<PipelinePreset>,
    pub provider: ExecutionProviderKind,
    pub json: bool,
}

/// Decodes image files and runs them through a [`FramePipeline`].
struct ImageFileFrames {
    pipeline: FramePipeline,
}

impl Preprocessor for ImageFileFrames {
    type Frame = PathBuf;

    fn preprocess(&self, path: &PathBuf) -> GestureResult<FrameTensor> {
        let image = image::open(path).map_err(|e| {
            GestureError::preprocessing(format!("cannot decode {}: {}", path.display(), e))
        })?;
        self.pipeline.run(&image)
    }
}

/// Prints one line per frame, as text or JSON.
struct ConsolePresenter {
    json: bool,
    max_frames: Option<u64>,
    frames_shown: u64,
    last_fps: Option<f64>,
}

impl ConsolePresenter {
    fn new(json: bool, max_frames: Option<u64>) -> Self {
        Self {
            json,
            max_frames,
            frames_shown: 0,
            last_fps: None,
        }
    }

    fn print_label(&self, frame_index: u64, label: GestureLabel, note: ColoredString) {
        let name = if label.is_idle() {
            label.name().bright_black()
        } else {
            label.name().green().bold()
        };
        println!(
            "  [{:>5}] {:<30} {:>10}  {}",
            frame_index,
            name,
            format_fps(self.last_fps),
            note
        );
    }
}

impl Presenter for ConsolePresenter {
    fn on_processed(&mut self, frame: &ProcessedFrame) {
        self.frames_shown += 1;
        self.last_fps = frame.timing.frames_per_second();

        if self.json {
            println!(
                "{}",
                json!({
                    "event": "processed",
                    "frame": frame.frame_index,
                    "label": frame.label.name(),
                    "index": frame.label.index(),
                    "raw_index": frame.raw_index,
                    "smoothed_index": frame.smoothed_index,
                    "confidence": frame.confidence,
                    "gated": frame.gated,
                    "fps": self.last_fps,
                    "timing": frame.timing,
                })
            );
            return;
        }

        let inference_us = frame
            .timing
            .stage(Stage::Inference)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        let note = if frame.gated {
            "low confidence, label held".yellow()
        } else {
            format!("inference {}", format_micros(inference_us)).bright_black()
        };
        self.print_label(frame.frame_index, frame.label, note);
    }

    fn on_skipped(&mut self, frame_index: u64, reused: GestureLabel) {
        self.frames_shown += 1;
        if self.json {
            println!(
                "{}",
                json!({
                    "event": "skipped",
                    "frame": frame_index,
                    "label": reused.name(),
                    "index": reused.index(),
                })
            );
            return;
        }
        self.print_label(frame_index, reused, "skipped".bright_black());
    }

    fn on_dropped(&mut self, frame_index: u64, reused: GestureLabel, error: &GestureError) {
        self.frames_shown += 1;
        if self.json {
            println!(
                "{}",
                json!({
                    "event": "dropped",
                    "frame": frame_index,
                    "label": reused.name(),
                    "index": reused.index(),
                    "error": error.to_string(),
                })
            );
            return;
        }
        self.print_label(frame_index, reused, format!("dropped: {}", error).yellow());
    }

    fn should_stop(&self) -> bool {
        self.max_frames.is_some_and(|max| self.frames_shown >= max)
    }
}

/// Resolves the configuration: file (if any), then command-line overrides.
fn load_config(options: &RunOptions) -> Result<EngineConfig> {
    let mut config = match &options.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(stride) = options.stride {
        config.stream.frame_stride = stride;
    }
    if let Some(preset) = options.pipeline {
        config.preprocessing.preset = preset;
    }
    if let Some(model) = &options.model {
        config.model.path = Some(model.clone());
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_summary(summary: &StreamSummary, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(&json!({ "event": "summary", "summary": summary }))?
        );
        return Ok(());
    }

    println!();
    println!("{}", "=".repeat(60));
    println!("{}", "Summary".bold());
    println!("{}", "=".repeat(60));
    println!("  Frames seen:      {}", summary.frames_seen);
    println!("  Processed:        {}", summary.frames_processed);
    println!("  Skipped:          {}", summary.frames_skipped);
    if summary.frames_dropped > 0 {
        println!(
            "  Dropped:          {}",
            summary.frames_dropped.to_string().yellow()
        );
    } else {
        println!("  Dropped:          0");
    }
    println!("  Throughput:       {}", format_fps(summary.mean_fps));
    println!("  Final label:      {}", summary.last_label.name().cyan().bold());
    if summary.stopped {
        println!("  {}", "(stopped at --max-frames)".bright_black());
    }
    Ok(())
}

pub fn handle_run_command(options: RunOptions) -> Result<()> {
    let config = load_config(&options)?;
    let model_path: &Path = config
        .model
        .path
        .as_deref()
        .context("No model given: pass --model or set model.path in the config")?;

    let frames = list_frame_files(&options.frames)
        .with_context(|| format!("Failed to read frame directory {}", options.frames.display()))?;
    if frames.is_empty() {
        bail!("No frame images (png, jpg, jpeg, bmp) in {}", options.frames.display());
    }
    tracing::info!(count = frames.len(), dir = %options.frames.display(), "Found frames");

    let session = ONNXSession::with_provider(model_path, options.provider)
        .with_context(|| format!("Failed to load model {}", model_path.display()))?;
    let preprocessor = ImageFileFrames {
        pipeline: FramePipeline::from_config(&config.preprocessing),
    };
    let mut controller = StreamingController::from_session(session, preprocessor, &config)
        .context("Model does not match the recurrent gesture contract")?;

    if !options.json {
        println!("{}", "Gesture stream".bold().cyan());
        println!("{}", "=".repeat(60));
        println!("  Model:     {}", model_path.display());
        println!("  Frames:    {} in {}", frames.len(), options.frames.display());
        println!(
            "  Stride:    every {} frame(s), pipeline {:?}",
            config.stream.frame_stride, config.preprocessing.preset
        );
        println!("{}", "=".repeat(60));
    }

    let mut presenter = ConsolePresenter::new(options.json, options.max_frames);
    let summary = controller
        .run(frames, &mut presenter)
        .context("Stream aborted")?;

    print_summary(&summary, options.json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options() -> RunOptions {
        RunOptions {
            model: None,
            frames: PathBuf::from("frames"),
            config: None,
            stride: None,
            max_frames: None,
            pipeline: None,
            provider: ExecutionProviderKind::Cpu,
            json: false,
        }
    }

    #[test]
    fn test_cli_overrides_apply_over_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("engine.yaml");
        fs::write(&path, "stream:\n  frame_stride: 3\nmodel:\n  path: from_config.onnx\n").unwrap();

        let mut opts = options();
        opts.config = Some(path);
        let config = load_config(&opts).unwrap();
        assert_eq!(config.stream.frame_stride, 3);
        assert_eq!(config.model.path, Some(PathBuf::from("from_config.onnx")));

        opts.stride = Some(1);
        opts.pipeline = Some(PipelinePreset::Simple);
        opts.model = Some(PathBuf::from("cli.onnx"));
        let config = load_config(&opts).unwrap();
        assert_eq!(config.stream.frame_stride, 1);
        assert_eq!(config.preprocessing.preset, PipelinePreset::Simple);
        assert_eq!(config.model.path, Some(PathBuf::from("cli.onnx")));
    }

    #[test]
    fn test_zero_stride_rejected() {
        let mut opts = options();
        opts.stride = Some(0);
        assert!(load_config(&opts).is_err());
    }

    #[test]
    fn test_undecodable_file_is_preprocessing_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("0001.png");
        fs::write(&path, b"not an image").unwrap();

        let frames = ImageFileFrames {
            pipeline: FramePipeline::jester(),
        };
        let err = frames.preprocess(&path).unwrap_err();
        assert!(matches!(err, GestureError::Preprocessing(_)));
    }

    #[test]
    fn test_presenter_stops_at_max_frames() {
        let mut presenter = ConsolePresenter::new(true, Some(2));
        assert!(!presenter.should_stop());
        presenter.on_skipped(0, GestureLabel::IDLE);
        presenter.on_skipped(1, GestureLabel::IDLE);
        assert!(presenter.should_stop());
    }

    #[test]
    fn test_missing_frame_dir_fails() {
        let mut opts = options();
        opts.model = Some(PathBuf::from("model.onnx"));
        opts.frames = PathBuf::from("/nonexistent/frames");
        assert!(handle_run_command(opts).is_err());
    }
}
