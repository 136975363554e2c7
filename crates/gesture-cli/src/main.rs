//! Gesture CLI - Command-line driver for the recurrent gesture stream engine.
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`commands`] | Command handlers organized by subcommand |
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Classify a directory of frames with an ONNX model |
//! | `labels` | Print the gesture category table |
//! | `config` | Print the default engine configuration |

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use commands::{handle_run_command, truncate, RunOptions};
use gesture_core::categories::GestureLabel;
use gesture_core::config::{EngineConfig, PipelinePreset};
use gesture_core::runtime_adapter::ExecutionProviderKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Gesture CLI - Real-time gesture classification over frame streams
#[derive(Parser)]
#[command(name = "gesture")]
#[command(about = "Gesture CLI - Classify video frames with a recurrent gesture model", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every image in a directory, in file-name order
    Run {
        /// Path to the ONNX model (overrides model.path from the config)
        #[arg(short, long, value_name = "FILE", env = "GESTURE_MODEL")]
        model: Option<PathBuf>,

        /// Directory of frame images (png, jpg, jpeg, bmp)
        #[arg(short, long, value_name = "DIR")]
        frames: PathBuf,

        /// Engine configuration file (YAML or JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Process every N-th frame; the others reuse the last label
        #[arg(long, value_name = "N")]
        stride: Option<u64>,

        /// Stop after N frames
        #[arg(long, value_name = "N")]
        max_frames: Option<u64>,

        /// Preprocessing preset: jester (scale, crop, normalize) or simple (resize)
        #[arg(short, long, value_name = "PRESET")]
        pipeline: Option<PipelinePreset>,

        /// ONNX Runtime execution provider
        #[arg(long, value_name = "PROVIDER", default_value = "cpu")]
        provider: ExecutionProviderKind,

        /// Emit one JSON object per frame instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the gesture category table
    Labels,
    /// Print the default engine configuration as YAML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run_command(cli)
}

/// Install the fmt subscriber on stderr; `log` records from gesture-core are
/// forwarded through the subscriber's log bridge.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .init();
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            model,
            frames,
            config,
            stride,
            max_frames,
            pipeline,
            provider,
            json,
        } => handle_run_command(RunOptions {
            model,
            frames,
            config,
            stride,
            max_frames,
            pipeline,
            provider,
            json,
        }),
        Commands::Labels => handle_labels_command(),
        Commands::Config => handle_config_command(),
    }
}

fn handle_labels_command() -> Result<()> {
    println!("{}", "Gesture categories".bold().cyan());
    println!("{}", "=".repeat(60));
    for label in GestureLabel::all() {
        let name = truncate(label.name(), 40);
        let note = if label.is_idle() {
            "idle".green()
        } else if label.is_masked() {
            "masked".yellow()
        } else if label.index() == 0 {
            "collapsed to idle".bright_black()
        } else {
            "".normal()
        };
        println!("  {:>2}  {:<40} {}", label.index(), name, note);
    }
    Ok(())
}

fn handle_config_command() -> Result<()> {
    print!("{}", EngineConfig::default().to_yaml_string()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_arguments() {
        let cli = Cli::try_parse_from([
            "gesture", "-vv", "run", "--model", "m.onnx", "--frames", "frames", "--stride", "1",
            "--pipeline", "simple", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run {
                model,
                stride,
                pipeline,
                provider,
                json,
                ..
            } => {
                assert_eq!(model, Some(PathBuf::from("m.onnx")));
                assert_eq!(stride, Some(1));
                assert_eq!(pipeline, Some(PipelinePreset::Simple));
                assert_eq!(provider, ExecutionProviderKind::Cpu);
                assert!(json);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_requires_frames() {
        assert!(Cli::try_parse_from(["gesture", "run", "--model", "m.onnx"]).is_err());
    }
}
