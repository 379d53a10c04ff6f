use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{AnalyzerError, Result};

/// Placeholder replaced by the absolute instruction file path.
pub const GCODE_PLACEHOLDER: &str = "{gcode}";

/// Poll `check` until it yields a value or `timeout` expires. Sleeps
/// `poll_interval` between attempts.
pub fn poll_with_timeout<T>(
    mut check: impl FnMut() -> std::io::Result<Option<T>>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<T> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(v) = check()? {
            return Ok(v);
        }
        if Instant::now() >= deadline {
            return Err(AnalyzerError::Timeout(timeout));
        }
        std::thread::sleep(poll_interval);
    }
}

/// Split a command line into words with POSIX shell quoting rules.
///
/// Quotes and backslash escapes group words; nothing is expanded.
pub fn split_command(line: &str) -> Result<Vec<String>> {
    shlex::split(line).ok_or(AnalyzerError::UnterminatedQuote)
}

/// Replace every `{gcode}` in every word with `gcode`.
pub fn substitute(argv: &[String], gcode: &Path) -> Vec<String> {
    let path = gcode.to_string_lossy();
    argv.iter()
        .map(|a| a.replace(GCODE_PLACEHOLDER, &path))
        .collect()
}
