//! In-memory stores and canned analyzers for tests and dry runs.

use std::collections::HashMap;
use std::path::Path;

use genius_traits::Analyzer;

use crate::analysis::AnalysisResult;
use crate::error::Result;
use crate::history::PrintHistory;
use crate::store::{HistoryStore, MetadataStore};

/// Analyzer that returns fixed output regardless of the file.
pub struct StaticAnalyzer {
    name: String,
    output: std::result::Result<String, String>,
}

impl StaticAnalyzer {
    pub fn ok(name: &str, output: &str) -> Self {
        Self {
            name: name.to_owned(),
            output: Ok(output.to_owned()),
        }
    }

    pub fn err(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_owned(),
            output: Err(reason.to_owned()),
        }
    }
}

impl Analyzer for StaticAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        _gcode: &Path,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.output.clone().map_err(Into::into)
    }
}

#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    entries: HashMap<(String, String), AnalysisResult>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn analysis(&self, origin: &str, path: &str) -> Result<Option<AnalysisResult>> {
        Ok(self
            .entries
            .get(&(origin.to_owned(), path.to_owned()))
            .cloned())
    }

    fn set_analysis(&mut self, origin: &str, path: &str, analysis: &AnalysisResult) -> Result<()> {
        self.entries
            .insert((origin.to_owned(), path.to_owned()), analysis.clone());
        Ok(())
    }
}

/// History store that counts saves.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    pub history: PrintHistory,
    pub saves: usize,
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<PrintHistory> {
        Ok(self.history.clone())
    }

    fn save(&mut self, history: &PrintHistory) -> Result<()> {
        self.history = history.clone();
        self.saves += 1;
        Ok(())
    }
}
