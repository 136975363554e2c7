//! The per-frame loop.
//!
//! ```text
//! frame ──► preprocess ──► infer ──► replace state ──► average ──► stabilize ──► emit
//!              │             │                            ▲
//!              └─ error ─────┴─► drop frame, re-emit last label
//! ```
//!
//! Only every `frame_stride`-th frame goes through the pipeline; the rest
//! re-emit the last label without touching the backend. Processing is
//! strictly sequential: one frame is finished before the next is accepted,
//! and a stop request is only honoured between frames.

use super::averager::LogitAverager;
use super::invoker::{InferenceInvoker, IoBinding};
use super::stabilizer::LabelStabilizer;
use super::state_store::{RecurrentStateStore, StateLayout};
use super::types::FrameTensor;
use crate::categories::GestureLabel;
use crate::config::EngineConfig;
use crate::error::{GestureError, GestureResult};
use crate::runtime_adapter::InferenceSession;
use crate::timing::{FrameTiming, SpanCollector, Stage};
use serde::Serialize;

/// Turns a raw frame into the model's input tensor.
pub trait Preprocessor {
    /// Raw frame type handed in by the frame source.
    type Frame;

    fn preprocess(&self, frame: &Self::Frame) -> GestureResult<FrameTensor>;
}

/// Receives what the controller emits, and may ask it to stop.
pub trait Presenter {
    /// A frame went through the whole pipeline.
    fn on_processed(&mut self, frame: &ProcessedFrame);

    /// A frame was skipped by the stride policy; `reused` is the last label.
    fn on_skipped(&mut self, _frame_index: u64, _reused: GestureLabel) {}

    /// A frame failed recoverably; `reused` is the last label.
    fn on_dropped(&mut self, _frame_index: u64, _reused: GestureLabel, _error: &GestureError) {}

    /// Checked before each frame.
    fn should_stop(&self) -> bool {
        false
    }
}

/// Result of one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFrame {
    pub frame_index: u64,
    /// Stable label after smoothing and debouncing
    pub label: GestureLabel,
    /// Arg-max of this frame's logits alone
    pub raw_index: usize,
    /// Arg-max of the windowed logit sum
    pub smoothed_index: usize,
    /// Softmax peak of this frame's logits
    pub confidence: Option<f32>,
    /// Whether the confidence gate replaced the smoothed index
    pub gated: bool,
    pub timing: FrameTiming,
}

/// What happened to one frame.
#[derive(Debug)]
pub enum FrameOutcome {
    Processed(ProcessedFrame),
    Skipped {
        frame_index: u64,
        label: GestureLabel,
    },
    Dropped {
        frame_index: u64,
        label: GestureLabel,
        error: GestureError,
    },
}

impl FrameOutcome {
    pub fn frame_index(&self) -> u64 {
        match self {
            FrameOutcome::Processed(p) => p.frame_index,
            FrameOutcome::Skipped { frame_index, .. } | FrameOutcome::Dropped { frame_index, .. } => {
                *frame_index
            }
        }
    }

    /// The label shown for this frame.
    pub fn label(&self) -> GestureLabel {
        match self {
            FrameOutcome::Processed(p) => p.label,
            FrameOutcome::Skipped { label, .. } | FrameOutcome::Dropped { label, .. } => *label,
        }
    }
}

/// Totals for one [`StreamingController::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamSummary {
    pub frames_seen: u64,
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_dropped: u64,
    /// Processed frames per second of processing time
    pub mean_fps: Option<f64>,
    pub last_label: GestureLabel,
    /// The presenter asked to stop before the source ran out
    pub stopped: bool,
}

/// Drives the frame loop and owns every piece of per-stream state.
pub struct StreamingController<S, P> {
    invoker: InferenceInvoker<S>,
    preprocessor: P,
    store: RecurrentStateStore,
    averager: LogitAverager,
    stabilizer: LabelStabilizer,
    frame_stride: u64,
    min_confidence: Option<f32>,
    idle_label: GestureLabel,
    frame_index: u64,
    last_label: GestureLabel,
    last_timing: Option<FrameTiming>,
}

impl<S: InferenceSession, P: Preprocessor> StreamingController<S, P> {
    /// Binds `session` (by configured names, else by declared order) and
    /// builds a cold-start controller.
    pub fn from_session(session: S, preprocessor: P, config: &EngineConfig) -> GestureResult<Self> {
        config.validate()?;
        let num_classes = config.model.num_classes;
        let invoker = match &config.model.binding {
            Some(names) => {
                InferenceInvoker::with_binding(session, IoBinding::from_names(names)?, num_classes)?
            }
            None => InferenceInvoker::new(session, num_classes)?,
        };
        Self::new(invoker, preprocessor, config)
    }

    pub fn new(
        invoker: InferenceInvoker<S>,
        preprocessor: P,
        config: &EngineConfig,
    ) -> GestureResult<Self> {
        config.validate()?;
        if invoker.num_classes() != config.model.num_classes {
            return Err(GestureError::config(format!(
                "invoker expects {} classes, config says {}",
                invoker.num_classes(),
                config.model.num_classes
            )));
        }

        let smoothing = &config.smoothing;
        let idle_label = label_for(smoothing.idle_class)?;
        let layout = StateLayout::from_config(&config.state)?;

        log::info!(
            "Streaming controller ready: stride {}, logit window {}, label history {}, refine {}",
            config.stream.frame_stride,
            smoothing.logit_window,
            smoothing.label_history,
            smoothing.refine_output
        );

        Ok(Self {
            invoker,
            preprocessor,
            store: RecurrentStateStore::new(layout),
            averager: LogitAverager::new(smoothing.logit_window),
            stabilizer: LabelStabilizer::new(smoothing),
            frame_stride: config.stream.frame_stride,
            min_confidence: smoothing.min_confidence,
            idle_label,
            frame_index: 0,
            last_label: idle_label,
            last_timing: None,
        })
    }

    /// Handles one frame.
    ///
    /// Recoverable failures come back as [`FrameOutcome::Dropped`] with
    /// state and histories untouched. Only fatal errors are returned as
    /// `Err`; the stream cannot continue after one.
    pub fn step(&mut self, frame: &P::Frame) -> GestureResult<FrameOutcome> {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        if frame_index % self.frame_stride != 0 {
            return Ok(FrameOutcome::Skipped {
                frame_index,
                label: self.last_label,
            });
        }

        match self.process(frame_index, frame) {
            Ok(processed) => {
                self.last_label = processed.label;
                self.last_timing = Some(processed.timing.clone());
                Ok(FrameOutcome::Processed(processed))
            }
            Err(error) if !error.is_fatal() => {
                log::warn!("Dropped frame {}: {}", frame_index, error);
                Ok(FrameOutcome::Dropped {
                    frame_index,
                    label: self.last_label,
                    error,
                })
            }
            Err(error) => Err(error),
        }
    }

    fn process(&mut self, frame_index: u64, frame: &P::Frame) -> GestureResult<ProcessedFrame> {
        let mut spans = SpanCollector::new();

        let tensor = spans.time(Stage::Preprocess, || self.preprocessor.preprocess(frame))?;
        let (logits, next_state) = spans.time(Stage::Inference, || {
            self.invoker.run(tensor, self.store.current())
        })?;
        self.store.replace(next_state)?;

        let raw_index = logits.argmax().unwrap_or(self.idle_label.index());
        let confidence = logits.softmax_peak();
        let smoothed_index = spans.time(Stage::Smoothing, || self.averager.observe(logits));

        let gated = match self.min_confidence {
            Some(threshold) => confidence.map_or(true, |c| c < threshold),
            None => false,
        };
        let candidate = if gated {
            self.last_label.index()
        } else {
            smoothed_index
        };

        let stable = spans.time(Stage::Stabilize, || self.stabilizer.stabilize(candidate));
        let label = label_for(stable)?;
        let timing = spans.finish();

        log::debug!(
            "Frame {}: raw {} smoothed {} stable {} ({}){}",
            frame_index,
            raw_index,
            smoothed_index,
            stable,
            label,
            if gated { " [gated]" } else { "" }
        );

        Ok(ProcessedFrame {
            frame_index,
            label,
            raw_index,
            smoothed_index,
            confidence,
            gated,
            timing,
        })
    }

    /// Feeds `frames` through [`step`](Self::step) until the source runs out,
    /// the presenter asks to stop, or a fatal error occurs.
    pub fn run<I, R>(&mut self, frames: I, presenter: &mut R) -> GestureResult<StreamSummary>
    where
        I: IntoIterator<Item = P::Frame>,
        R: Presenter + ?Sized,
    {
        let mut summary = StreamSummary {
            last_label: self.last_label,
            ..StreamSummary::default()
        };
        let mut processing_us: u64 = 0;

        for frame in frames {
            if presenter.should_stop() {
                log::info!("Stop requested after {} frames", summary.frames_seen);
                summary.stopped = true;
                break;
            }

            let outcome = self.step(&frame)?;
            summary.frames_seen += 1;
            match &outcome {
                FrameOutcome::Processed(processed) => {
                    summary.frames_processed += 1;
                    processing_us += processed.timing.total_us;
                    presenter.on_processed(processed);
                }
                FrameOutcome::Skipped { frame_index, label } => {
                    summary.frames_skipped += 1;
                    presenter.on_skipped(*frame_index, *label);
                }
                FrameOutcome::Dropped {
                    frame_index,
                    label,
                    error,
                } => {
                    summary.frames_dropped += 1;
                    presenter.on_dropped(*frame_index, *label, error);
                }
            }
        }

        summary.last_label = self.last_label;
        summary.mean_fps = (processing_us > 0)
            .then(|| summary.frames_processed as f64 * 1_000_000.0 / processing_us as f64);
        log::info!(
            "Stream finished: {} seen, {} processed, {} skipped, {} dropped",
            summary.frames_seen,
            summary.frames_processed,
            summary.frames_skipped,
            summary.frames_dropped
        );
        Ok(summary)
    }

    /// Back to cold start: zero state, fresh histories, counter 0, idle label.
    pub fn reset(&mut self) {
        self.store.reset();
        self.averager.clear();
        self.stabilizer.reset();
        self.frame_index = 0;
        self.last_label = self.idle_label;
        self.last_timing = None;
        log::debug!("Streaming controller reset");
    }

    pub fn last_label(&self) -> GestureLabel {
        self.last_label
    }

    /// Timing of the most recent processed frame.
    pub fn last_timing(&self) -> Option<&FrameTiming> {
        self.last_timing.as_ref()
    }

    /// Frames handed to [`step`](Self::step) since construction or reset.
    pub fn frames_seen(&self) -> u64 {
        self.frame_index
    }

    pub fn frame_stride(&self) -> u64 {
        self.frame_stride
    }

    pub fn store(&self) -> &RecurrentStateStore {
        &self.store
    }

    pub fn averager(&self) -> &LogitAverager {
        &self.averager
    }

    pub fn stabilizer(&self) -> &LabelStabilizer {
        &self.stabilizer
    }

    pub fn invoker(&self) -> &InferenceInvoker<S> {
        &self.invoker
    }

    pub fn preprocessor(&self) -> &P {
        &self.preprocessor
    }
}

fn label_for(index: usize) -> GestureResult<GestureLabel> {
    GestureLabel::from_index(index)
        .ok_or_else(|| GestureError::config(format!("class {} is not in the category table", index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockPreprocessor, MockSession, RecordingPresenter};

    fn controller(session: MockSession, config: &EngineConfig) -> StreamingController<MockSession, MockPreprocessor> {
        StreamingController::from_session(session, MockPreprocessor::default(), config).unwrap()
    }

    fn every_frame() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.stream.frame_stride = 1;
        config
    }

    #[test]
    fn test_first_frame_emits_model_label() {
        let session = MockSession::jester().with_logits(fixtures::logits_peaking_at(14));
        let mut c = controller(session, &every_frame());
        let p = match c.step(&Some(0.0)).unwrap() {
            FrameOutcome::Processed(p) => p,
            other => panic!("expected processed frame, got {:?}", other),
        };
        assert_eq!(p.label.index(), 14);
        assert_eq!(p.raw_index, 14);
        assert_eq!(p.smoothed_index, 14);
        assert!(!p.gated);
        assert_eq!(c.store().replacements(), 1);
    }

    #[test]
    fn test_stride_two_skips_odd_frames() {
        let session = MockSession::jester().with_logits(fixtures::logits_peaking_at(14));
        let mut c = controller(session, &EngineConfig::default());

        let outcomes: Vec<FrameOutcome> = (0..5).map(|_| c.step(&Some(0.0)).unwrap()).collect();

        assert_eq!(c.invoker().session().call_count(), 3);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.frame_index(), i as u64);
            match (i % 2, outcome) {
                (0, FrameOutcome::Processed(_)) => {}
                (1, FrameOutcome::Skipped { label, .. }) => assert_eq!(label.index(), 14),
                _ => panic!("unexpected outcome for frame {}: {:?}", i, outcome),
            }
        }
    }

    #[test]
    fn test_dropped_frame_keeps_state_and_histories() {
        let session = MockSession::jester()
            .with_logits(fixtures::logits_peaking_at(14))
            .fail_on_call(2, "device lost");
        let mut c = controller(session, &every_frame());

        c.step(&Some(0.0)).unwrap();
        c.step(&Some(0.0)).unwrap();
        let state_before = c.store().current().clone();
        let logits_before = c.averager().len();
        let labels_before = c.stabilizer().history().clone();

        let outcome = c.step(&Some(0.0)).unwrap();
        match outcome {
            FrameOutcome::Dropped { label, ref error, .. } => {
                assert_eq!(label.index(), 14);
                assert!(!error.is_fatal());
            }
            other => panic!("expected dropped frame, got {:?}", other),
        }
        assert_eq!(c.store().current(), &state_before);
        assert_eq!(c.averager().len(), logits_before);
        assert_eq!(c.stabilizer().history(), &labels_before);

        // Next frame recovers.
        assert!(matches!(c.step(&Some(0.0)).unwrap(), FrameOutcome::Processed(_)));
    }

    #[test]
    fn test_preprocessing_failure_drops_frame() {
        let mut c = controller(MockSession::jester(), &every_frame());
        let outcome = c.step(&None).unwrap();
        assert!(matches!(
            outcome,
            FrameOutcome::Dropped {
                error: GestureError::Preprocessing(_),
                ..
            }
        ));
        assert_eq!(c.invoker().session().call_count(), 0);
        assert_eq!(outcome.label(), GestureLabel::IDLE);
    }

    #[test]
    fn test_state_shape_change_is_fatal() {
        let session = MockSession::jester().with_state_output_shape(3, vec![1, 8, 7, 7]);
        let mut c = controller(session, &every_frame());
        let err = c.step(&Some(0.0)).unwrap_err();
        assert!(matches!(err, GestureError::StateShape { slot: 3, .. }));
        assert_eq!(c.store().replacements(), 0);
        assert_eq!(c.store().current(), &c.store().layout().zeros());
    }

    #[test]
    fn test_state_flows_between_frames() {
        let mut c = controller(MockSession::jester(), &every_frame());
        for _ in 0..3 {
            c.step(&Some(0.0)).unwrap();
        }
        // The mock echoes state + 1 per call.
        assert!(c.store().current().slot(0).iter().all(|&v| v == 3.0));
        let calls = c.invoker().session().calls();
        assert!(calls[2]["shift_in_9"].iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_confidence_gate_keeps_last_label() {
        let mut config = every_frame();
        config.smoothing.min_confidence = Some(0.5);
        config.smoothing.logit_window = 1;
        let session = MockSession::jester().with_logit_script(vec![
            fixtures::logits_peaking_at(14),
            fixtures::logits_peaking_at(14),
            fixtures::flat_logits_with_edge_at(20),
        ]);
        let mut c = controller(session, &config);

        c.step(&Some(0.0)).unwrap();
        c.step(&Some(0.0)).unwrap();
        let FrameOutcome::Processed(p) = c.step(&Some(0.0)).unwrap() else {
            panic!("expected processed frame");
        };
        assert_eq!(p.raw_index, 20);
        assert!(p.gated);
        assert_eq!(p.label.index(), 14);
    }

    #[test]
    fn test_run_counts_and_stop_signal() {
        let session = MockSession::jester()
            .with_logits(fixtures::logits_peaking_at(14))
            .fail_on_call(1, "timeout");
        let mut c = controller(session, &EngineConfig::default());
        let mut presenter = RecordingPresenter::stop_after(6);

        let frames = vec![Some(0.0); 10];
        let summary = c.run(frames, &mut presenter).unwrap();

        assert!(summary.stopped);
        assert_eq!(summary.frames_seen, 6);
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(summary.frames_dropped, 1);
        assert_eq!(summary.frames_skipped, 3);
        assert_eq!(summary.last_label.index(), 14);
        assert_eq!(presenter.events().len(), 6);
    }

    #[test]
    fn test_reset_returns_to_cold_start() {
        let session = MockSession::jester().with_logits(fixtures::logits_peaking_at(14));
        let mut c = controller(session, &every_frame());
        c.step(&Some(0.0)).unwrap();
        c.step(&Some(0.0)).unwrap();

        c.reset();
        assert_eq!(c.frames_seen(), 0);
        assert_eq!(c.last_label(), GestureLabel::IDLE);
        assert!(c.last_timing().is_none());
        assert!(c.averager().is_empty());
        assert_eq!(c.stabilizer().len(), 1);
        assert_eq!(c.store().replacements(), 0);
    }

    #[test]
    fn test_num_classes_mismatch_rejected() {
        let invoker = InferenceInvoker::new(MockSession::jester(), 10).unwrap();
        let result = StreamingController::new(invoker, MockPreprocessor::default(), &EngineConfig::default());
        assert!(matches!(result, Err(GestureError::Config(_))));
    }
}
