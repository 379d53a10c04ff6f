use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("empty command")]
    EmptyCommand,
    #[error("unterminated quote or escape in command template")]
    UnterminatedQuote,
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
    #[error("output is not valid UTF-8")]
    NonUtf8,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
