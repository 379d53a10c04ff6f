//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "genius.toml";

#[derive(Parser, Debug)]
#[command(name = "genius", version, about = "Print time estimation from progress maps")]
pub struct Cli {
    /// Path to config TOML; defaults to ./genius.toml when present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit JSON (results, tick lines, errors) instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a progress map fragment from an analyzer trace
    BuildMap {
        /// Trace file; reads stdin when omitted
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Minimum simulated seconds between kept samples (overrides config)
        #[arg(long, value_name = "SECS")]
        min_interval_s: Option<f64>,
    },
    /// Run all analyzers on a G-code file and store the compensated result
    Analyze {
        gcode: PathBuf,
        /// Use this trace as the built-in analysis instead of the configured pattern
        #[arg(long, value_name = "FILE")]
        trace: Option<PathBuf>,
        /// Write the result here instead of `<gcode>.genius.json`
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Skip history compensation
        #[arg(long, action = ArgAction::SetTrue)]
        no_compensate: bool,
    },
    /// Replay progress ticks against a stored analysis
    Replay {
        /// Analysis result JSON
        analysis: PathBuf,
        /// CSV with `progress,elapsed` headers
        #[arg(long, value_name = "CSV")]
        ticks: PathBuf,
        /// Actual total print seconds; defaults to the last tick's elapsed time
        #[arg(long, value_name = "SECS")]
        actual_total: Option<f64>,
        /// Append the completed print to the history file
        #[arg(long, action = ArgAction::SetTrue)]
        record: bool,
    },
    /// Show or clear the print history
    History {
        #[arg(long, action = ArgAction::SetTrue)]
        clear: bool,
    },
}
