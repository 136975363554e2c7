//! Streaming module - the recurrent inference engine.
//!
//! Leaves first:
//!
//! - `state_store` - owns the ten recurrent state tensors between calls
//! - `invoker` - one backend call: frame + state in, logits + state out
//! - `averager` - sliding sum of recent logits
//! - `stabilizer` - masking, idle collapsing and flicker suppression
//! - `controller` - the per-frame loop tying them together
//!
//! Per processed frame:
//!
//! ```text
//! FrameTensor ─► InferenceInvoker ─► (LogitVector, RecurrentState)
//!                      ▲                   │            │
//!                      │                   ▼            ▼
//!                      └──── RecurrentStateStore   LogitAverager ─► LabelStabilizer ─► label
//! ```

pub mod averager;
pub mod controller;
pub mod invoker;
pub mod stabilizer;
pub mod state_store;
pub mod types;

pub use averager::{LogitAverager, DEFAULT_LOGIT_WINDOW};
pub use controller::{
    FrameOutcome, Preprocessor, Presenter, ProcessedFrame, StreamSummary, StreamingController,
};
pub use invoker::{InferenceInvoker, IoBinding};
pub use stabilizer::{LabelStabilizer, DEFAULT_LABEL_HISTORY};
pub use state_store::{RecurrentState, RecurrentStateStore, StateLayout, STATE_SLOT_COUNT};
pub use types::{FrameTensor, LogitVector};
