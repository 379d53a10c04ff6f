//! Analysis pipeline: analyzers, merge, calibration, compensation.
//!
//! Analyzers run one after another. Each produces a fragment (a JSON object
//! or a trace that is built into one); fragments are merged in order, later
//! keys overriding earlier ones. A failing analyzer is logged and skipped,
//! it never aborts the others.

use std::path::Path;

use genius_traits::Analyzer;
use serde_json::{Map, Value};

use crate::analysis::{AnalysisResult, merge_fragment};
use crate::builder::{BuildOptions, fragment_from_trace};
use crate::compensation::compensate_or_passthrough;
use crate::error::GeniusError;
use crate::history::HistoryRecord;
use crate::trace::parse_trace;

struct Stage {
    analyzer: Box<dyn Analyzer>,
    enabled: bool,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Final (possibly compensated) result, ready to store.
    pub result: AnalysisResult,
    /// Analyzers that failed, in run order.
    pub failures: Vec<GeniusError>,
    /// Names of analyzers whose output was merged.
    pub merged: Vec<String>,
    pub compensated: bool,
}

pub struct AnalysisPipeline {
    builtin: Option<Box<dyn Analyzer>>,
    stages: Vec<Stage>,
    build: BuildOptions,
    compensate: bool,
}

impl AnalysisPipeline {
    pub fn new(build: BuildOptions) -> Self {
        Self {
            builtin: None,
            stages: Vec::new(),
            build,
            compensate: true,
        }
    }

    /// Analysis that runs first and provides the base fragment.
    #[must_use]
    pub fn with_builtin(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.builtin = Some(Box::new(analyzer));
        self
    }

    /// Append a configured analyzer. Disabled ones are listed but never run.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static, enabled: bool) -> Self {
        self.stages.push(Stage {
            analyzer: Box::new(analyzer),
            enabled,
        });
        self
    }

    #[must_use]
    pub fn with_compensation(mut self, on: bool) -> Self {
        self.compensate = on;
        self
    }

    /// Run every analyzer against `gcode` and finish the result against `history`.
    pub fn run(&self, gcode: &Path, history: &[HistoryRecord]) -> AnalysisReport {
        self.run_with(gcode, history, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_merged` with the analyzer name and
    /// the merged fragment after each successful analyzer.
    pub fn run_with<F>(
        &self,
        gcode: &Path,
        history: &[HistoryRecord],
        mut on_merged: F,
    ) -> AnalysisReport
    where
        F: FnMut(&str, &Map<String, Value>),
    {
        let mut report = AnalysisReport::default();
        let mut merged = Map::new();
        let mut result = AnalysisResult::default();

        let builtin = self.builtin.iter().map(|a| &**a);
        let configured = self.stages.iter().filter_map(|s| {
            if !s.enabled {
                tracing::info!(analyzer = %s.analyzer.name(), "analyzer disabled, skipping");
            }
            s.enabled.then_some(&*s.analyzer)
        });

        for analyzer in builtin.chain(configured) {
            let name = analyzer.name().to_owned();
            tracing::info!(analyzer = %name, gcode = %gcode.display(), "running analyzer");
            match self.run_one(analyzer, gcode, &merged) {
                Ok((candidate, decoded)) => {
                    merged = candidate;
                    result = decoded;
                    on_merged(&name, &merged);
                    tracing::info!(analyzer = %name, keys = merged.len(), "analyzer finished");
                    report.merged.push(name);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "analyzer failed, skipping");
                    report.failures.push(e);
                }
            }
        }

        if result.has_progress_inputs() {
            if let Err(e) = result.calibrate() {
                tracing::warn!(error = %e, "failed to derive calibration fields");
            }
            if self.compensate && !history.is_empty() {
                let before = result.estimated_print_time;
                result = compensate_or_passthrough(&result, history);
                report.compensated = result.estimated_print_time != before;
                tracing::info!(
                    analyzed = ?before,
                    compensated = ?result.estimated_print_time,
                    records = history.len(),
                    "compensation applied"
                );
            }
        } else {
            tracing::debug!("no progress map or filament positions, skipping calibration");
        }

        report.result = result;
        report
    }

    /// Run one analyzer and merge its fragment over `merged`. The merge is
    /// only accepted when the combined object still decodes, so a badly
    /// typed key fails this analyzer alone.
    fn run_one(
        &self,
        analyzer: &dyn Analyzer,
        gcode: &Path,
        merged: &Map<String, Value>,
    ) -> Result<(Map<String, Value>, AnalysisResult), GeniusError> {
        let failure = |reason: String| GeniusError::AnalyzerFailure {
            analyzer: analyzer.name().to_owned(),
            reason,
        };
        let output = analyzer.run(gcode).map_err(|e| failure(e.to_string()))?;
        let fragment = parse_output(&output, self.build).map_err(|e| failure(e.to_string()))?;
        let mut candidate = merged.clone();
        merge_fragment(&mut candidate, fragment);
        let decoded =
            AnalysisResult::from_fragment(candidate.clone()).map_err(|e| failure(e.to_string()))?;
        Ok((candidate, decoded))
    }
}

/// Read analyzer output: a single JSON object is taken as-is, anything else
/// is parsed as a trace and built into a fragment.
pub fn parse_output(output: &str, opts: BuildOptions) -> Result<Map<String, Value>, GeniusError> {
    let trimmed = output.trim_start();
    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(m)) => Ok(m),
            Ok(_) => Err(GeniusError::MalformedMap(
                "analyzer output is not an object".into(),
            )),
            Err(e) => Err(GeniusError::MalformedMap(format!("analyzer output: {e}"))),
        };
    }
    let trace = parse_trace(output)?;
    fragment_from_trace(trace, opts)
}
