//! Recurrent state buffers.
//!
//! The model carries a working memory of recent motion in ten "shift
//! buffer" tensors. Each call consumes the current buffers and returns their
//! successors; [`RecurrentStateStore`] owns them between calls and refuses
//! any successor whose shapes differ from the layout fixed at construction.

use crate::config::StateConfig;
use crate::error::{GestureError, GestureResult};
use ndarray::{ArrayD, IxDyn};

/// Number of recurrent state slots the model exchanges per call.
pub const STATE_SLOT_COUNT: usize = 10;

/// Fixed per-slot shapes, in backend input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    shapes: [Vec<usize>; STATE_SLOT_COUNT],
}

impl StateLayout {
    /// Builds a layout from exactly [`STATE_SLOT_COUNT`] shapes.
    pub fn new(shapes: Vec<Vec<usize>>) -> GestureResult<Self> {
        let count = shapes.len();
        let shapes: [Vec<usize>; STATE_SLOT_COUNT] = shapes.try_into().map_err(|_| {
            GestureError::config(format!(
                "recurrent state needs {} slots, got {}",
                STATE_SLOT_COUNT, count
            ))
        })?;
        Ok(Self { shapes })
    }

    pub fn from_config(config: &StateConfig) -> GestureResult<Self> {
        Self::new(config.slot_shapes.clone())
    }

    pub fn shape(&self, slot: usize) -> &[usize] {
        &self.shapes[slot]
    }

    pub fn shapes(&self) -> &[Vec<usize>] {
        &self.shapes
    }

    /// Cold-start state: every slot zero-filled.
    pub fn zeros(&self) -> RecurrentState {
        RecurrentState {
            slots: std::array::from_fn(|i| ArrayD::zeros(IxDyn(&self.shapes[i]))),
        }
    }

    /// First slot whose shape differs from the layout, as `(slot, actual)`.
    fn first_mismatch<'a>(&self, state: &'a RecurrentState) -> Option<(usize, &'a [usize])> {
        state
            .slots
            .iter()
            .enumerate()
            .find(|(i, slot)| slot.shape() != self.shapes[*i].as_slice())
            .map(|(i, slot)| (i, slot.shape()))
    }
}

impl Default for StateLayout {
    fn default() -> Self {
        let shapes = StateConfig::default().slot_shapes;
        Self {
            shapes: std::array::from_fn(|i| shapes[i].clone()),
        }
    }
}

/// The ten recurrent tensors exchanged with the backend on one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrentState {
    slots: [ArrayD<f32>; STATE_SLOT_COUNT],
}

impl RecurrentState {
    pub fn new(slots: [ArrayD<f32>; STATE_SLOT_COUNT]) -> Self {
        Self { slots }
    }

    /// Collects backend outputs; anything but exactly ten tensors is a
    /// broken model contract.
    pub fn from_vec(slots: Vec<ArrayD<f32>>) -> GestureResult<Self> {
        let count = slots.len();
        let slots: [ArrayD<f32>; STATE_SLOT_COUNT] = slots.try_into().map_err(|_| {
            GestureError::config(format!(
                "backend returned {} recurrent tensors, expected {}",
                count, STATE_SLOT_COUNT
            ))
        })?;
        Ok(Self { slots })
    }

    pub fn slot(&self, index: usize) -> &ArrayD<f32> {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[ArrayD<f32>] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArrayD<f32>> {
        self.slots.iter()
    }
}

/// Sole owner of the recurrent state between inference calls.
#[derive(Debug)]
pub struct RecurrentStateStore {
    layout: StateLayout,
    state: RecurrentState,
    replacements: u64,
}

impl RecurrentStateStore {
    /// Creates a store holding the cold-start state for `layout`.
    pub fn new(layout: StateLayout) -> Self {
        let state = layout.zeros();
        Self {
            layout,
            state,
            replacements: 0,
        }
    }

    /// Read-only view of the current slots, in position order.
    pub fn current(&self) -> &RecurrentState {
        &self.state
    }

    /// Swaps in the state returned by the latest inference call.
    ///
    /// Every slot must keep its construction-time shape. On mismatch the
    /// store is left untouched and a fatal [`GestureError::StateShape`] is
    /// returned: the backend no longer honours the declared contract.
    pub fn replace(&mut self, new_state: RecurrentState) -> GestureResult<()> {
        if let Some((slot, actual)) = self.layout.first_mismatch(&new_state) {
            let err = GestureError::StateShape {
                slot,
                expected: self.layout.shape(slot).to_vec(),
                actual: actual.to_vec(),
            };
            log::error!("{}", err);
            return Err(err);
        }
        self.state = new_state;
        self.replacements += 1;
        Ok(())
    }

    /// Back to cold start.
    pub fn reset(&mut self) {
        self.state = self.layout.zeros();
        self.replacements = 0;
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Successful replacements since construction or the last reset.
    pub fn replacements(&self) -> u64 {
        self.replacements
    }
}

impl Default for RecurrentStateStore {
    fn default() -> Self {
        Self::new(StateLayout::default())
    }
}
