#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and replay tick parsing.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The tick CSV loader enforces headers and a non-decreasing clock.
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Replay tick CSV schema.
///
/// Expected headers:
/// progress,elapsed
///
/// Example:
/// progress,elapsed
/// 0.0,0
/// 0.25,910.5
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TickRow {
    pub progress: f64,
    pub elapsed: f64,
}

/// Analyzer command. Accepts either a shell-like line or an argv array:
/// - `command = "python3 analyze.py \"{gcode}\""`
/// - `command = ["python3", "analyze.py", "{gcode}"]`
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    fn is_blank(&self) -> bool {
        match self {
            Self::Line(s) => s.trim().is_empty(),
            Self::Argv(v) => v.first().is_none_or(|p| p.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerCfg {
    pub command: CommandSpec,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

const fn enabled_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisCfg {
    /// Run the built-in analysis (a trace recorded next to the file).
    pub builtin: bool,
    /// Path pattern of the recorded trace; `{gcode}` is the file path.
    pub builtin_trace: String,
    /// Minimum simulated seconds between two kept map samples.
    pub min_interval_s: f64,
    /// Per external analyzer wall-clock limit (ms).
    pub timeout_ms: u64,
    /// External analyzers, run in order after the built-in one.
    pub analyzers: Vec<AnalyzerCfg>,
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            builtin: true,
            builtin_trace: "{gcode}.trace".into(),
            min_interval_s: 60.0,
            timeout_ms: 600_000,
            analyzers: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryCfg {
    /// JSON file holding the print history.
    pub file: PathBuf,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            file: PathBuf::from("print_history.json"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisCfg,
    pub history: HistoryCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&s).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_ticks_csv(path: &Path) -> eyre::Result<Vec<TickRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open ticks CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["progress", "elapsed"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "ticks CSV must have headers 'progress,elapsed', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<TickRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<TickRow>().enumerate() {
        let line = idx + 2;
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", line, e))?;
        if !(row.progress.is_finite() && row.elapsed.is_finite()) {
            eyre::bail!("CSV row {} has a non-finite value", line);
        }
        if let Some(prev) = rows.last()
            && row.elapsed < prev.elapsed
        {
            eyre::bail!(
                "CSV row {}: elapsed went backwards ({} < {})",
                line,
                row.elapsed,
                prev.elapsed
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const ROTATIONS: [&str; 3] = ["never", "daily", "hourly"];

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Analysis
        let a = &self.analysis;
        if !a.min_interval_s.is_finite() || a.min_interval_s < 0.0 {
            eyre::bail!("analysis.min_interval_s must be a finite value >= 0");
        }
        if a.timeout_ms == 0 {
            eyre::bail!("analysis.timeout_ms must be >= 1");
        }
        if a.timeout_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("analysis.timeout_ms is unreasonably large (>24h)");
        }
        if a.builtin && a.builtin_trace.trim().is_empty() {
            eyre::bail!("analysis.builtin_trace must not be empty when builtin = true");
        }
        for (i, an) in a.analyzers.iter().enumerate() {
            if an.command.is_blank() {
                eyre::bail!("analysis.analyzers[{}].command must not be empty", i);
            }
        }

        // History
        if self.history.file.as_os_str().is_empty() {
            eyre::bail!("history.file must not be empty");
        }

        // Logging
        if let Some(level) = &self.logging.level
            && !LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.level must be one of {}", LEVELS.join("|"));
        }
        if let Some(rot) = &self.logging.rotation
            && !ROTATIONS.contains(&rot.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.rotation must be one of {}", ROTATIONS.join("|"));
        }
        Ok(())
    }
}
