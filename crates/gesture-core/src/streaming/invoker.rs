//! One synchronous backend call per processed frame.
//!
//! The recurrent model takes the frame plus ten state tensors and returns the
//! logits plus ten successor state tensors. Which backend name carries which
//! value is captured once in an [`IoBinding`]; after that the invoker only
//! moves tensors between the engine's typed values and the backend's named
//! maps.

use super::state_store::{RecurrentState, STATE_SLOT_COUNT};
use super::types::{FrameTensor, LogitVector};
use crate::config::BindingNames;
use crate::error::{GestureError, GestureResult, InferenceError};
use crate::runtime_adapter::{InferenceSession, TensorMap};

/// Backend tensor names for every value the engine exchanges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoBinding {
    frame_input: String,
    state_inputs: [String; STATE_SLOT_COUNT],
    logits_output: String,
    state_outputs: [String; STATE_SLOT_COUNT],
}

impl IoBinding {
    /// Derives the binding from the backend's declared names: first input is
    /// the frame, first output the logits, the rest are state slots 0..10.
    pub fn from_session<S: InferenceSession + ?Sized>(session: &S) -> GestureResult<Self> {
        let (frame_input, state_inputs) = split_names("input", session.input_names())?;
        let (logits_output, state_outputs) = split_names("output", session.output_names())?;
        Ok(Self {
            frame_input,
            state_inputs,
            logits_output,
            state_outputs,
        })
    }

    /// Binding from explicit configuration.
    pub fn from_names(names: &BindingNames) -> GestureResult<Self> {
        let to_slots = |what: &str, list: &[String]| -> GestureResult<[String; STATE_SLOT_COUNT]> {
            list.to_vec().try_into().map_err(|_| {
                GestureError::config(format!(
                    "binding needs {} state {} names, got {}",
                    STATE_SLOT_COUNT,
                    what,
                    list.len()
                ))
            })
        };
        Ok(Self {
            frame_input: names.frame_input.clone(),
            state_inputs: to_slots("input", &names.state_inputs)?,
            logits_output: names.logits_output.clone(),
            state_outputs: to_slots("output", &names.state_outputs)?,
        })
    }

    pub fn frame_input(&self) -> &str {
        &self.frame_input
    }

    pub fn state_input(&self, slot: usize) -> &str {
        &self.state_inputs[slot]
    }

    pub fn logits_output(&self) -> &str {
        &self.logits_output
    }

    pub fn state_output(&self, slot: usize) -> &str {
        &self.state_outputs[slot]
    }

    /// Every bound name must exist on the backend.
    fn check_against<S: InferenceSession + ?Sized>(&self, session: &S) -> GestureResult<()> {
        let inputs = session.input_names();
        let outputs = session.output_names();
        let missing_input = std::iter::once(&self.frame_input)
            .chain(self.state_inputs.iter())
            .find(|name| !inputs.contains(*name));
        if let Some(name) = missing_input {
            return Err(GestureError::config(format!(
                "model has no input named '{}' (inputs: {:?})",
                name, inputs
            )));
        }
        let missing_output = std::iter::once(&self.logits_output)
            .chain(self.state_outputs.iter())
            .find(|name| !outputs.contains(*name));
        if let Some(name) = missing_output {
            return Err(GestureError::config(format!(
                "model has no output named '{}' (outputs: {:?})",
                name, outputs
            )));
        }
        Ok(())
    }
}

fn split_names(what: &str, names: &[String]) -> GestureResult<(String, [String; STATE_SLOT_COUNT])> {
    match names.split_first() {
        Some((head, rest)) if rest.len() == STATE_SLOT_COUNT => {
            let slots: [String; STATE_SLOT_COUNT] = std::array::from_fn(|i| rest[i].clone());
            Ok((head.clone(), slots))
        }
        _ => Err(GestureError::config(format!(
            "model declares {} {}s, expected {} (1 + {} recurrent slots)",
            names.len(),
            what,
            STATE_SLOT_COUNT + 1,
            STATE_SLOT_COUNT
        ))),
    }
}

/// Wraps the backend with the frame + state in, logits + state out contract.
pub struct InferenceInvoker<S> {
    session: S,
    binding: IoBinding,
    num_classes: usize,
}

impl<S: InferenceSession> InferenceInvoker<S> {
    /// Binds by the backend's declared name order.
    pub fn new(session: S, num_classes: usize) -> GestureResult<Self> {
        let binding = IoBinding::from_session(&session)?;
        log::debug!(
            "Bound frame input '{}' and logits output '{}' by position",
            binding.frame_input,
            binding.logits_output
        );
        Ok(Self {
            session,
            binding,
            num_classes,
        })
    }

    /// Uses an explicit binding, checked against the backend's names.
    pub fn with_binding(session: S, binding: IoBinding, num_classes: usize) -> GestureResult<Self> {
        binding.check_against(&session)?;
        Ok(Self {
            session,
            binding,
            num_classes,
        })
    }

    /// Runs the backend exactly once for `frame`.
    ///
    /// Nothing is retried. A missing output or a logits tensor of the wrong
    /// size is an [`InferenceError`]; state outputs are passed through as
    /// returned and shape-checked by the state store.
    pub fn run(
        &self,
        frame: FrameTensor,
        state: &RecurrentState,
    ) -> GestureResult<(LogitVector, RecurrentState)> {
        let mut inputs = TensorMap::with_capacity(STATE_SLOT_COUNT + 1);
        inputs.insert(self.binding.frame_input.clone(), frame.into_inner());
        for (slot, tensor) in state.iter().enumerate() {
            inputs.insert(self.binding.state_inputs[slot].clone(), tensor.clone());
        }

        let mut outputs = self.session.run(inputs)?;

        let logits_tensor = outputs
            .remove(&self.binding.logits_output)
            .ok_or_else(|| InferenceError::MissingOutput(self.binding.logits_output.clone()))?;
        let logits = LogitVector::from_tensor(logits_tensor, self.num_classes)?;

        let mut slots = Vec::with_capacity(STATE_SLOT_COUNT);
        for name in &self.binding.state_outputs {
            let tensor = outputs
                .remove(name)
                .ok_or_else(|| InferenceError::MissingOutput(name.clone()))?;
            slots.push(tensor);
        }

        Ok((logits, RecurrentState::from_vec(slots)?))
    }

    pub fn binding(&self) -> &IoBinding {
        &self.binding
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
