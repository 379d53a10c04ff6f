//! Analyzer trace parsing.
//!
//! Trace format, one record per line:
//!
//! ```text
//! Progress:<position>,<cumulative filament>,<elapsed seconds>
//! Analysis:<json object>
//! ```
//!
//! Blank and unrecognized lines are ignored. `Analysis:` objects are merged in
//! order, later keys overriding earlier ones.

use serde_json::{Map, Value};

use crate::error::GeniusError;

const PROGRESS_PREFIX: &str = "Progress:";
const ANALYSIS_PREFIX: &str = "Analysis:";

/// One raw sample emitted by an analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSample {
    pub position: f64,
    pub filament: f64,
    pub elapsed: f64,
}

/// Parsed trace: samples in file order plus merged key/value metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub samples: Vec<TraceSample>,
    pub analysis: Map<String, Value>,
}

impl Trace {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.analysis.is_empty()
    }
}

/// Parse a whole trace. Errors carry the 1-based line number.
pub fn parse_trace(text: &str) -> Result<Trace, GeniusError> {
    let mut trace = Trace::default();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
            trace.samples.push(parse_progress(rest, line_no)?);
        } else if let Some(rest) = line.strip_prefix(ANALYSIS_PREFIX) {
            let value: Value = serde_json::from_str(rest).map_err(|e| GeniusError::Trace {
                line: line_no,
                reason: format!("invalid analysis JSON: {e}"),
            })?;
            let Value::Object(obj) = value else {
                return Err(GeniusError::Trace {
                    line: line_no,
                    reason: "analysis line must hold a JSON object".into(),
                });
            };
            trace.analysis.extend(obj);
        }
    }
    tracing::debug!(
        samples = trace.samples.len(),
        analysis_keys = trace.analysis.len(),
        "parsed trace"
    );
    Ok(trace)
}

fn parse_progress(rest: &str, line: usize) -> Result<TraceSample, GeniusError> {
    let mut fields = [0.0f64; 3];
    let mut parts = rest.split(',');
    for (i, slot) in fields.iter_mut().enumerate() {
        let part = parts.next().ok_or_else(|| GeniusError::Trace {
            line,
            reason: format!("expected 3 comma-separated numbers, got {i}"),
        })?;
        let v: f64 = part.trim().parse().map_err(|_| GeniusError::Trace {
            line,
            reason: format!("not a number: '{}'", part.trim()),
        })?;
        if !v.is_finite() {
            return Err(GeniusError::Trace {
                line,
                reason: format!("non-finite value: '{}'", part.trim()),
            });
        }
        *slot = v;
    }
    if parts.next().is_some() {
        return Err(GeniusError::Trace {
            line,
            reason: "expected 3 comma-separated numbers, got more".into(),
        });
    }
    let [position, filament, elapsed] = fields;
    Ok(TraceSample {
        position,
        filament,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_and_analysis_lines() {
        let text = "\
Analysis:{\"printer\":\"mk3\"}
Progress:0.0,0,0

something else
Progress:0.5, 12.5, 300
Analysis:{\"printer\":\"mini\",\"layers\":42}
";
        let t = parse_trace(text).unwrap();
        assert_eq!(t.samples.len(), 2);
        assert_eq!(
            t.samples[1],
            TraceSample {
                position: 0.5,
                filament: 12.5,
                elapsed: 300.0
            }
        );
        assert_eq!(t.analysis["printer"], "mini");
        assert_eq!(t.analysis["layers"], 42);
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse_trace("Progress:0,0,0\nProgress:0.1,abc,5\n").unwrap_err();
        assert_eq!(
            err,
            GeniusError::Trace {
                line: 2,
                reason: "not a number: 'abc'".into()
            }
        );
    }

    #[test]
    fn rejects_wrong_arity_and_non_objects() {
        assert!(parse_trace("Progress:0.1,2").is_err());
        assert!(parse_trace("Progress:0.1,2,3,4").is_err());
        assert!(parse_trace("Progress:0.1,inf,3").is_err());
        assert!(parse_trace("Analysis:[1,2]").is_err());
    }

    #[test]
    fn empty_input_is_empty_trace() {
        assert!(parse_trace("").unwrap().is_empty());
    }
}
