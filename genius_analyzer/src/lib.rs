#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Analyzer adapters: external commands and pre-recorded trace files.

pub mod error;
pub mod util;

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use genius_traits::Analyzer;

use crate::error::{AnalyzerError, Result};
use crate::util::{GCODE_PLACEHOLDER, poll_with_timeout, split_command, substitute};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Argument vector with `{gcode}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
}

impl CommandTemplate {
    /// Parse a shell-like command line.
    pub fn parse(line: &str) -> Result<Self> {
        Self::from_argv(split_command(line)?)
    }

    pub fn from_argv(argv: Vec<String>) -> Result<Self> {
        if argv.first().is_none_or(|p| p.is_empty()) {
            return Err(AnalyzerError::EmptyCommand);
        }
        Ok(Self { argv })
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn render(&self, gcode: &Path) -> Vec<String> {
        substitute(&self.argv, gcode)
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.argv.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if a.is_empty() || a.contains(char::is_whitespace) {
                write!(f, "\"{a}\"")?;
            } else {
                f.write_str(a)?;
            }
        }
        Ok(())
    }
}

/// Runs an external program and returns its standard output.
///
/// The child is polled until it exits or the timeout expires, in which case
/// it is killed. Standard output and error are drained on helper threads so
/// a child filling its pipe never blocks.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    name: String,
    template: CommandTemplate,
    timeout: Duration,
    poll_interval: Duration,
}

impl CommandAnalyzer {
    pub fn new(template: CommandTemplate) -> Self {
        Self {
            name: template.to_string(),
            template,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn execute(&self, gcode: &Path) -> Result<String> {
        let gcode = std::path::absolute(gcode).unwrap_or_else(|_| gcode.to_path_buf());
        let argv = self.template.render(&gcode);
        let (program, args) = argv.split_first().ok_or(AnalyzerError::EmptyCommand)?;
        tracing::debug!(program = %program, args = ?args, "spawning analyzer");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AnalyzerError::Spawn {
                program: program.clone(),
                source,
            })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match poll_with_timeout(|| child.try_wait(), self.timeout, self.poll_interval)
        {
            Ok(status) => status,
            Err(e) => {
                if let Err(kill_err) = child.kill() {
                    tracing::warn!(error = %kill_err, "failed to kill analyzer");
                }
                let _ = child.wait();
                return Err(e);
            }
        };

        let stdout = join(stdout)?;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&join(stderr)?).trim().to_owned();
            return Err(AnalyzerError::Exit {
                status: status.to_string(),
                stderr,
            });
        }
        String::from_utf8(stdout).map_err(|_| AnalyzerError::NonUtf8)
    }
}

impl Analyzer for CommandAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        gcode: &Path,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.execute(gcode)?)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            p.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| std::io::Error::other("output reader panicked"))?
        .map_err(AnalyzerError::from)
}

/// Built-in analysis: reads a trace recorded next to the instruction file.
///
/// The path pattern takes the same `{gcode}` placeholder as commands, e.g.
/// `{gcode}.trace`.
#[derive(Debug, Clone)]
pub struct TraceFileAnalyzer {
    pattern: String,
}

impl TraceFileAnalyzer {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn resolve(&self, gcode: &Path) -> PathBuf {
        PathBuf::from(
            self.pattern
                .replace(GCODE_PLACEHOLDER, &gcode.to_string_lossy()),
        )
    }
}

impl Analyzer for TraceFileAnalyzer {
    fn name(&self) -> &str {
        "builtin"
    }

    fn run(
        &self,
        gcode: &Path,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let path = self.resolve(gcode);
        tracing::debug!(path = %path.display(), "reading recorded trace");
        std::fs::read_to_string(&path).map_err(|e| format!("{}: {e}", path.display()).into())
    }
}
