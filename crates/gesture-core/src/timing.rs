//! Timing module - per-stage spans for the throughput readout.
//!
//! Each processed frame opens one span per pipeline stage. The spans are
//! flat (a frame's stages never nest) and are folded into a [`FrameTiming`]
//! when the frame is done.
//!
//! # Usage
//!
//! ```ignore
//! use gesture_core::timing::{SpanCollector, Stage};
//!
//! let mut spans = SpanCollector::new();
//! let tensor = spans.time(Stage::Preprocess, || pipeline.run(&image))?;
//! let timing = spans.finish();
//! println!("{:.1} frames/s", timing.frames_per_second().unwrap_or(0.0));
//! ```
//!
//! Timings are advisory. Nothing in the engine branches on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// A stage of the per-frame pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preprocess,
    Inference,
    Smoothing,
    Stabilize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Inference => "inference",
            Stage::Smoothing => "smoothing",
            Stage::Stabilize => "stabilize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub stage: Stage,
    /// Duration in microseconds
    pub duration_us: u64,
}

impl Span {
    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.duration_us)
    }
}

/// Collector for the spans of a single frame.
#[derive(Debug)]
pub struct SpanCollector {
    spans: Vec<Span>,
    active: Option<(Stage, Instant)>,
    started: Instant,
}

impl SpanCollector {
    pub fn new() -> Self {
        Self {
            spans: Vec::with_capacity(4),
            active: None,
            started: Instant::now(),
        }
    }

    /// Open a span for `stage`, closing any span still open.
    pub fn start_span(&mut self, stage: Stage) {
        self.end_span();
        self.active = Some((stage, Instant::now()));
    }

    /// Close the open span, if any.
    pub fn end_span(&mut self) {
        if let Some((stage, start)) = self.active.take() {
            self.spans.push(Span {
                stage,
                duration_us: start.elapsed().as_micros() as u64,
            });
        }
    }

    /// Run `f` inside a span for `stage`.
    ///
    /// The span is closed whether or not `f` succeeds, so a failing stage
    /// still shows up in the spans collected so far.
    pub fn time<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        self.start_span(stage);
        let out = f();
        self.end_span();
        out
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty() && self.active.is_none()
    }

    /// Close everything and fold into a [`FrameTiming`].
    ///
    /// `total` is wall-clock from collector creation, so it also covers the
    /// glue between stages.
    pub fn finish(mut self) -> FrameTiming {
        self.end_span();
        FrameTiming {
            spans: self.spans,
            total_us: self.started.elapsed().as_micros() as u64,
        }
    }
}

impl Default for SpanCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing of one processed frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameTiming {
    pub spans: Vec<Span>,
    /// Wall-clock time from preprocessing start to stabilization end, in microseconds
    pub total_us: u64,
}

impl FrameTiming {
    pub fn total(&self) -> Duration {
        Duration::from_micros(self.total_us)
    }

    /// Summed duration of every span recorded for `stage`.
    pub fn stage(&self, stage: Stage) -> Option<Duration> {
        let mut matching = self.spans.iter().filter(|s| s.stage == stage).peekable();
        matching.peek()?;
        Some(matching.map(Span::duration).sum())
    }

    /// Throughput estimate if every frame took as long as this one.
    ///
    /// `None` when the frame was too fast to measure.
    pub fn frames_per_second(&self) -> Option<f64> {
        (self.total_us > 0).then(|| 1_000_000.0 / self.total_us as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_spans_recorded_in_order() {
        let mut spans = SpanCollector::new();
        spans.time(Stage::Preprocess, || ());
        let value = spans.time(Stage::Inference, || 42);
        assert_eq!(value, 42);

        let stages: Vec<Stage> = spans.spans().iter().map(|s| s.stage).collect();
        assert_eq!(stages, vec![Stage::Preprocess, Stage::Inference]);
    }

    #[test]
    fn test_start_span_closes_previous() {
        let mut spans = SpanCollector::new();
        spans.start_span(Stage::Smoothing);
        spans.start_span(Stage::Stabilize);
        let timing = spans.finish();
        assert_eq!(timing.spans.len(), 2);
        assert_eq!(timing.spans[1].stage, Stage::Stabilize);
    }

    #[test]
    fn test_total_covers_stages() {
        let mut spans = SpanCollector::new();
        spans.time(Stage::Inference, || thread::sleep(Duration::from_millis(5)));
        let timing = spans.finish();

        let inference = timing.stage(Stage::Inference).unwrap();
        assert!(inference >= Duration::from_millis(5));
        assert!(timing.total() >= inference);
        assert!(timing.stage(Stage::Preprocess).is_none());

        let fps = timing.frames_per_second().unwrap();
        assert!(fps > 0.0 && fps <= 200.0);
    }

    #[test]
    fn test_frames_per_second() {
        let timing = FrameTiming {
            spans: Vec::new(),
            total_us: 40_000,
        };
        assert!((timing.frames_per_second().unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(FrameTiming::default().frames_per_second(), None);
    }

    #[test]
    fn test_serializes_stage_names() {
        let timing = FrameTiming {
            spans: vec![Span {
                stage: Stage::Preprocess,
                duration_us: 120,
            }],
            total_us: 150,
        };
        let json = serde_json::to_value(&timing).unwrap();
        assert_eq!(json["spans"][0]["stage"], "preprocess");
        assert_eq!(json["total_us"], 150);
    }
}
