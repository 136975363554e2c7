//! Mock implementations for testing.
//!
//! Provides a scripted backend, a trivial preprocessor and a recording
//! presenter so the engine can be exercised without model files.

use super::fixtures;
use crate::categories::GestureLabel;
use crate::error::{GestureError, GestureResult};
use crate::runtime_adapter::{AdapterError, AdapterResult, InferenceSession, TensorMap};
use crate::streaming::{FrameTensor, Preprocessor, Presenter, ProcessedFrame};
use ndarray::{ArrayD, IxDyn};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A backend that follows the recurrent model contract with scripted logits.
///
/// By default every state output is the matching state input plus one, so
/// tests can see state flowing from call to call. It can also:
/// - Return a fixed logits tensor, or a different one per call
/// - Fail on chosen calls
/// - Omit an output or change a state output's shape
/// - Record every call's inputs
///
/// # Example
///
/// ```rust,ignore
/// use gesture_core::testing::{fixtures, MockSession};
///
/// let session = MockSession::jester()
///     .with_logits(fixtures::logits_peaking_at(14))
///     .fail_on_call(3, "device lost");
/// ```
pub struct MockSession {
    input_names: Vec<String>,
    output_names: Vec<String>,
    logit_script: Vec<ArrayD<f32>>,
    failures: HashMap<usize, String>,
    omitted: HashSet<String>,
    reshaped: HashMap<usize, Vec<usize>>,
    calls: Mutex<Vec<TensorMap>>,
}

impl MockSession {
    /// Names laid out like the exported Jester model: `input` +
    /// `shift_in_0..9`, `logits` + `shift_out_0..9`.
    pub fn jester() -> Self {
        let (input_names, output_names) = fixtures::jester_io_names();
        Self {
            input_names,
            output_names,
            logit_script: vec![fixtures::sample_logits(crate::categories::NUM_CLASSES)],
            failures: HashMap::new(),
            omitted: HashSet::new(),
            reshaped: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Return `logits` on every call.
    pub fn with_logits(mut self, logits: ArrayD<f32>) -> Self {
        self.logit_script = vec![logits];
        self
    }

    /// Return `script[i]` on call `i`, repeating the last entry afterwards.
    pub fn with_logit_script(mut self, script: Vec<ArrayD<f32>>) -> Self {
        if !script.is_empty() {
            self.logit_script = script;
        }
        self
    }

    pub fn with_input_names(mut self, names: Vec<String>) -> Self {
        self.input_names = names;
        self
    }

    pub fn with_output_names(mut self, names: Vec<String>) -> Self {
        self.output_names = names;
        self
    }

    /// Fail call number `call` (0-based) with an inference error.
    pub fn fail_on_call(mut self, call: usize, message: impl Into<String>) -> Self {
        self.failures.insert(call, message.into());
        self
    }

    /// Leave `name` out of every result.
    pub fn without_output(mut self, name: impl Into<String>) -> Self {
        self.omitted.insert(name.into());
        self
    }

    /// Return a zero tensor of `shape` for state slot `slot` on every call.
    pub fn with_state_output_shape(mut self, slot: usize, shape: Vec<usize>) -> Self {
        self.reshaped.insert(slot, shape);
        self
    }

    /// Inputs of every call so far, failed calls included.
    pub fn calls(&self) -> Vec<TensorMap> {
        self.lock_calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<TensorMap>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn logits_for(&self, call: usize) -> ArrayD<f32> {
        let index = call.min(self.logit_script.len().saturating_sub(1));
        self.logit_script[index].clone()
    }
}

impl InferenceSession for MockSession {
    fn run(&self, inputs: TensorMap) -> AdapterResult<TensorMap> {
        let call = {
            let mut calls = self.lock_calls();
            calls.push(inputs.clone());
            calls.len() - 1
        };

        if let Some(message) = self.failures.get(&call) {
            return Err(AdapterError::InferenceFailed(message.clone()));
        }

        for name in &self.input_names {
            if !inputs.contains_key(name) {
                return Err(AdapterError::InvalidInput(format!("missing input '{}'", name)));
            }
        }

        let mut outputs = TensorMap::new();
        if let Some(logits_name) = self.output_names.first() {
            outputs.insert(logits_name.clone(), self.logits_for(call));
        }

        let state_inputs = self.input_names.iter().skip(1);
        let state_outputs = self.output_names.iter().skip(1);
        for (slot, (input, output)) in state_inputs.zip(state_outputs).enumerate() {
            let tensor = match self.reshaped.get(&slot) {
                Some(shape) => ArrayD::zeros(IxDyn(shape)),
                None => inputs[input].mapv(|v| v + 1.0),
            };
            outputs.insert(output.clone(), tensor);
        }

        outputs.retain(|name, _| !self.omitted.contains(name));
        Ok(outputs)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

/// Preprocessor over fake frames.
///
/// A frame is `Some(value)` for a tensor filled with `value`, or `None` for
/// a frame that fails to preprocess.
#[derive(Debug, Clone)]
pub struct MockPreprocessor {
    edge: usize,
}

impl MockPreprocessor {
    pub fn with_edge(edge: usize) -> Self {
        Self { edge }
    }
}

impl Default for MockPreprocessor {
    fn default() -> Self {
        Self::with_edge(224)
    }
}

impl Preprocessor for MockPreprocessor {
    type Frame = Option<f32>;

    fn preprocess(&self, frame: &Option<f32>) -> GestureResult<FrameTensor> {
        match frame {
            Some(value) => FrameTensor::new(ArrayD::from_elem(
                IxDyn(&[1, 3, self.edge, self.edge]),
                *value,
            )),
            None => Err(GestureError::preprocessing("unreadable frame")),
        }
    }
}

/// One presenter callback, as recorded by [`RecordingPresenter`].
#[derive(Debug, Clone, PartialEq)]
pub enum PresentedEvent {
    Processed { frame_index: u64, label: GestureLabel },
    Skipped { frame_index: u64, label: GestureLabel },
    Dropped { frame_index: u64, label: GestureLabel, error: String },
}

impl PresentedEvent {
    pub fn label(&self) -> GestureLabel {
        match self {
            PresentedEvent::Processed { label, .. }
            | PresentedEvent::Skipped { label, .. }
            | PresentedEvent::Dropped { label, .. } => *label,
        }
    }
}

/// Presenter that records every callback and can stop after N of them.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    events: Vec<PresentedEvent>,
    stop_after: Option<usize>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_after(events: usize) -> Self {
        Self {
            events: Vec::new(),
            stop_after: Some(events),
        }
    }

    pub fn events(&self) -> &[PresentedEvent] {
        &self.events
    }

    /// Label indices in emission order.
    pub fn labels(&self) -> Vec<usize> {
        self.events.iter().map(|e| e.label().index()).collect()
    }
}

impl Presenter for RecordingPresenter {
    fn on_processed(&mut self, frame: &ProcessedFrame) {
        self.events.push(PresentedEvent::Processed {
            frame_index: frame.frame_index,
            label: frame.label,
        });
    }

    fn on_skipped(&mut self, frame_index: u64, reused: GestureLabel) {
        self.events.push(PresentedEvent::Skipped {
            frame_index,
            label: reused,
        });
    }

    fn on_dropped(&mut self, frame_index: u64, reused: GestureLabel, error: &GestureError) {
        self.events.push(PresentedEvent::Dropped {
            frame_index,
            label: reused,
            error: error.to_string(),
        });
    }

    fn should_stop(&self) -> bool {
        self.stop_after.is_some_and(|n| self.events.len() >= n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::STATE_SLOT_COUNT;

    #[test]
    fn test_mock_session_contract() {
        let session = MockSession::jester();
        assert_eq!(session.input_names().len(), STATE_SLOT_COUNT + 1);
        assert_eq!(session.output_names().len(), STATE_SLOT_COUNT + 1);

        let outputs = session.run(fixtures::jester_inputs()).unwrap();
        assert_eq!(outputs["logits"].shape(), &[1, 27]);
        assert_eq!(outputs["shift_out_8"].shape(), &[1, 20, 7, 7]);
        assert!(outputs["shift_out_0"].iter().all(|&v| v == 1.0));
        assert_eq!(session.call_count(), 1);
    }

    #[test]
    fn test_mock_session_rejects_missing_input() {
        let session = MockSession::jester();
        let mut inputs = fixtures::jester_inputs();
        inputs.remove("shift_in_2");
        assert!(matches!(session.run(inputs), Err(AdapterError::InvalidInput(_))));
    }

    #[test]
    fn test_logit_script_repeats_last() {
        let session = MockSession::jester().with_logit_script(vec![
            fixtures::logits_peaking_at(1),
            fixtures::logits_peaking_at(5),
        ]);
        let peaks: Vec<f32> = (0..3)
            .map(|_| session.run(fixtures::jester_inputs()).unwrap()["logits"][[0, 5]])
            .collect();
        assert_eq!(peaks, vec![0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_recording_presenter_stops() {
        let mut presenter = RecordingPresenter::stop_after(1);
        assert!(!presenter.should_stop());
        presenter.on_skipped(1, GestureLabel::IDLE);
        assert!(presenter.should_stop());
        assert_eq!(presenter.labels(), vec![2]);
    }
}
