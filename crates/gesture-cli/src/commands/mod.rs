//! CLI command handlers organized by subcommand.
//!
//! | Module | Commands |
//! |--------|----------|
//! | [`run`] | `run` - Classify a directory of frames |
//!
//! `labels` and `config` are small enough to live in `main.rs`.

pub mod run;
pub mod utils;

pub use run::{handle_run_command, RunOptions};
pub use utils::*;
