//! Human-readable error descriptions and structured JSON error formatting.

use genius_core::GeniusError;

/// Stable name of the error kind, used in JSON output.
pub fn error_kind(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<GeniusError>() {
        Some(GeniusError::OutOfRange { .. }) => "OutOfRange",
        Some(GeniusError::MalformedMap(_)) => "MalformedMap",
        Some(GeniusError::AnalyzerFailure { .. }) => "AnalyzerFailure",
        Some(GeniusError::MissingMetadata(_)) => "MissingMetadata",
        Some(GeniusError::DivisionDegenerate { .. }) => "DivisionDegenerate",
        Some(GeniusError::Trace { .. }) => "Trace",
        None => "Error",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ge) = err.downcast_ref::<GeniusError>() {
        return match ge {
            GeniusError::Trace { line, reason } => format!(
                "What happened: The analyzer trace is invalid at line {line} ({reason}).\nLikely causes: A truncated trace or an analyzer printing a different format.\nHow to fix: Each record must be `Progress:<pos>,<filament>,<secs>` or `Analysis:<json object>`."
            ),
            GeniusError::MalformedMap(msg) => format!(
                "What happened: The progress map is malformed ({msg}).\nLikely causes: Positions not strictly increasing or non-numeric values in a stored result.\nHow to fix: Re-run `genius analyze` on the G-code file."
            ),
            GeniusError::AnalyzerFailure { analyzer, reason } => format!(
                "What happened: Analysis produced no result ({analyzer}: {reason}).\nLikely causes: No recorded trace next to the file and no working analyzer command.\nHow to fix: Pass --trace, or check [analysis] in the config; rerun with --log-level=debug."
            ),
            GeniusError::MissingMetadata(what) => format!(
                "What happened: Required analysis data is missing ({what}).\nLikely causes: The analysis never found extruding moves.\nHow to fix: Check that the trace reports cumulative filament."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config or CSV loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("ticks csv must have headers") {
        return "Invalid headers in ticks CSV. Expected 'progress,elapsed'.".to_string();
    }

    let config_key = ["analysis.", "history.", "logging."]
        .iter()
        .any(|k| lower.starts_with(k));
    if lower.contains("parse config") || (config_key && lower.contains("must")) {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<GeniusError>() {
        Some(GeniusError::Trace { .. }) => 3,
        Some(GeniusError::MalformedMap(_)) => 4,
        Some(GeniusError::AnalyzerFailure { .. }) => 5,
        Some(GeniusError::MissingMetadata(_)) => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": error_kind(err), "message": humanize(err) }).to_string()
}
