use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeniusError {
    #[error("position {x} outside map domain [{min}, {max}]")]
    OutOfRange { x: f64, min: f64, max: f64 },
    #[error("malformed progress map: {0}")]
    MalformedMap(String),
    #[error("analyzer '{analyzer}' failed: {reason}")]
    AnalyzerFailure { analyzer: String, reason: String },
    #[error("missing metadata: {0}")]
    MissingMetadata(&'static str),
    #[error("history record {index} has a zero-length analyzed print segment")]
    DivisionDegenerate { index: usize },
    #[error("trace line {line}: {reason}")]
    Trace { line: usize, reason: String },
}

impl GeniusError {
    /// Out-of-range lookups are expected during normal operation and only
    /// signal "fall back"; everything else points at bad data.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::MissingMetadata(_))
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
