//! Subcommand implementations.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use eyre::WrapErr;
use genius_analyzer::{CommandAnalyzer, CommandTemplate, TraceFileAnalyzer};
use genius_config::{CommandSpec, Config, load_ticks_csv};
use genius_core::builder::{BuildOptions, fragment_from_trace};
use genius_core::store::{HistoryStore, MetadataStore};
use genius_core::{
    AnalysisPipeline, CompletionPayload, EstimateSource, GeniusError, JobTracker, LinearBaseline,
    parse_trace,
};
use genius_traits::SystemClock;
use serde_json::json;

use crate::store::{
    FileHistoryStore, FileMetadataStore, FixedMetadataStore, read_analysis, sidecar_path,
    write_atomic,
};

fn build_options(cfg: &Config, override_secs: Option<f64>) -> eyre::Result<BuildOptions> {
    let secs = override_secs.unwrap_or(cfg.analysis.min_interval_s);
    if !secs.is_finite() || secs < 0.0 {
        eyre::bail!("min_interval_s must be a finite value >= 0, got {secs}");
    }
    Ok(BuildOptions {
        min_interval_secs: secs,
    })
}

/// Trace on stdin or `input` to a fragment on stdout.
pub fn build_map(
    cfg: &Config,
    input: Option<&Path>,
    min_interval_s: Option<f64>,
) -> eyre::Result<()> {
    let opts = build_options(cfg, min_interval_s)?;
    let text = match input {
        Some(p) => std::fs::read_to_string(p)
            .wrap_err_with(|| format!("read trace {}", p.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin()
                .read_to_string(&mut s)
                .wrap_err("read trace from stdin")?;
            s
        }
    };
    let trace = parse_trace(&text)?;
    tracing::info!(samples = trace.samples.len(), "trace parsed");
    let fragment = fragment_from_trace(trace, opts)?;
    println!("{}", serde_json::Value::Object(fragment));
    Ok(())
}

fn command_template(spec: &CommandSpec) -> eyre::Result<CommandTemplate> {
    let t = match spec {
        CommandSpec::Line(line) => CommandTemplate::parse(line),
        CommandSpec::Argv(argv) => CommandTemplate::from_argv(argv.clone()),
    };
    t.map_err(|e| eyre::eyre!("invalid analyzer command {:?}: {}", spec, e))
}

fn pipeline(
    cfg: &Config,
    trace: Option<&Path>,
    compensate: bool,
) -> eyre::Result<AnalysisPipeline> {
    let mut p = AnalysisPipeline::new(build_options(cfg, None)?).with_compensation(compensate);
    match trace {
        Some(t) => p = p.with_builtin(TraceFileAnalyzer::new(t.to_string_lossy())),
        None if cfg.analysis.builtin => {
            p = p.with_builtin(TraceFileAnalyzer::new(cfg.analysis.builtin_trace.clone()));
        }
        None => tracing::info!("built-in analysis disabled"),
    }
    let timeout = Duration::from_millis(cfg.analysis.timeout_ms);
    for a in &cfg.analysis.analyzers {
        let analyzer = CommandAnalyzer::new(command_template(&a.command)?).with_timeout(timeout);
        p = p.with_analyzer(analyzer, a.enabled);
    }
    Ok(p)
}

/// Run every analyzer and store the (compensated) result.
pub fn analyze(
    cfg: &Config,
    json: bool,
    gcode: &Path,
    trace: Option<&Path>,
    out: Option<&Path>,
    no_compensate: bool,
) -> eyre::Result<()> {
    let history = FileHistoryStore::new(&cfg.history.file).load()?;
    let pipeline = pipeline(cfg, trace, !no_compensate)?;
    let report = pipeline.run(gcode, history.records());

    if report.merged.is_empty() {
        let reason = report
            .failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(GeniusError::AnalyzerFailure {
            analyzer: "all".into(),
            reason: if reason.is_empty() {
                "no analyzers configured".into()
            } else {
                reason
            },
        }
        .into());
    }

    let dest = out.map_or_else(|| sidecar_path(gcode), Path::to_path_buf);
    match out {
        Some(_) => write_atomic(&dest, &serde_json::to_vec_pretty(&report.result)?)?,
        None => {
            FileMetadataStore.set_analysis("local", &gcode.to_string_lossy(), &report.result)?;
        }
    }
    tracing::info!(path = %dest.display(), "analysis stored");

    let r = &report.result;
    if json {
        println!(
            "{}",
            json!({
                "path": dest,
                "estimatedPrintTime": r.estimated_print_time,
                "firstFilament": r.first_filament,
                "lastFilament": r.last_filament,
                "points": r.progress.as_ref().map(genius_core::ProgressMap::len),
                "compensated": report.compensated,
                "analyzers": report.merged,
                "failures": report.failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        );
    } else {
        match r.estimated_print_time {
            Some(t) => println!("estimated print time: {}", format_secs(t)),
            None => println!("estimated print time: unknown"),
        }
        if report.compensated {
            println!("compensated with {} history record(s)", history.len());
        }
        for f in &report.failures {
            println!("skipped: {f}");
        }
        println!("stored: {}", dest.display());
    }
    Ok(())
}

/// Feed recorded ticks through a job tracker.
pub fn replay(
    cfg: &Config,
    json: bool,
    analysis: &Path,
    ticks: &Path,
    actual_total: Option<f64>,
    record: bool,
) -> eyre::Result<()> {
    let text = std::fs::read_to_string(analysis)
        .wrap_err_with(|| format!("read analysis {}", analysis.display()))?;
    let metadata = FixedMetadataStore(read_analysis(&text, analysis)?);
    let rows = load_ticks_csv(ticks)?;
    let path = analysis.to_string_lossy();

    let mut job = JobTracker::start("local", &path, &metadata, LinearBaseline);
    for row in &rows {
        let est = job.estimate(row.progress, row.elapsed);
        let (remaining, source) = match est {
            Some(e) => (
                Some(e.remaining_secs),
                match e.source {
                    EstimateSource::Genius => "genius",
                    EstimateSource::Baseline(label) => label,
                },
            ),
            None => (None, "none"),
        };
        if json {
            println!(
                "{}",
                json!({
                    "progress": row.progress,
                    "elapsed": row.elapsed,
                    "remaining": remaining,
                    "source": source,
                })
            );
        } else {
            let rem = remaining.map_or_else(|| "-".to_owned(), format_secs);
            println!(
                "progress={:.4} elapsed={} remaining={} source={}",
                row.progress,
                format_secs(row.elapsed),
                rem,
                source
            );
        }
    }

    if !record {
        return Ok(());
    }
    let total = actual_total
        .or_else(|| rows.last().map(|r| r.elapsed))
        .ok_or_else(|| eyre::eyre!("no ticks to derive the total print time from"))?;
    let payload = CompletionPayload {
        origin: "local".into(),
        path: path.into_owned(),
        actual_total_time: total,
        ..Default::default()
    };
    let mut history = FileHistoryStore::new(&cfg.history.file);
    match job.finish(payload, &metadata, &mut history, &SystemClock)? {
        Some(rec) => {
            tracing::info!(
                heat_up = rec.heat_up(),
                cool_down = rec.cool_down(),
                "print recorded"
            );
            if !json {
                println!("recorded in {}", history.path().display());
            }
        }
        None => {
            if !json {
                println!("not recorded: calibration data incomplete");
            }
        }
    }
    Ok(())
}

/// Print or clear the history file.
pub fn history(cfg: &Config, json: bool, clear: bool) -> eyre::Result<()> {
    let mut store = FileHistoryStore::new(&cfg.history.file);
    let mut history = store.load()?;
    if clear {
        history.clear();
        store.save(&history)?;
        tracing::info!(path = %store.path().display(), "print history cleared");
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        println!("no prints recorded");
    }
    for r in history.records() {
        let scale = r
            .scale()
            .map_or_else(|| "-".to_owned(), |s| format!("{s:.3}"));
        println!(
            "{} total={} heat_up={} cool_down={} scale={}",
            r.payload.path,
            format_secs(r.payload.actual_total_time),
            format_secs(r.heat_up()),
            format_secs(r.cool_down()),
            scale
        );
    }
    Ok(())
}

/// `1h02m03s` style; negative values keep their sign.
pub fn format_secs(secs: f64) -> String {
    let sign = if secs < 0.0 { "-" } else { "" };
    let total = secs.abs().round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{sign}{h}h{m:02}m{s:02}s")
    } else if m > 0 {
        format!("{sign}{m}m{s:02}s")
    } else {
        format!("{sign}{s}s")
    }
}
