mod cli;
mod commands;
mod error_fmt;
mod logging;
mod store;

use std::path::Path;

use clap::Parser;
use genius_config::Config;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: error reporting hooks not installed: {e}");
    }

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(explicit: Option<&Path>) -> eyre::Result<Config> {
    if let Some(path) = explicit {
        return genius_config::load_file(path);
    }
    let default = Path::new(DEFAULT_CONFIG);
    if default.exists() {
        genius_config::load_file(default)
    } else {
        Ok(Config::default())
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init_logging(&cfg.logging, cli.log_level.as_deref(), cli.json)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match cli.cmd {
        Commands::BuildMap {
            input,
            min_interval_s,
        } => commands::build_map(&cfg, input.as_deref(), min_interval_s),
        Commands::Analyze {
            gcode,
            trace,
            out,
            no_compensate,
        } => commands::analyze(
            &cfg,
            cli.json,
            &gcode,
            trace.as_deref(),
            out.as_deref(),
            no_compensate,
        ),
        Commands::Replay {
            analysis,
            ticks,
            actual_total,
            record,
        } => commands::replay(&cfg, cli.json, &analysis, &ticks, actual_total, record),
        Commands::History { clear } => commands::history(&cfg, cli.json, clear),
    }
}
