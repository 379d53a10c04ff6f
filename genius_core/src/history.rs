//! Rolling history of completed prints.
//!
//! Each record pairs what actually happened on a past print (elapsed time at
//! the first/last filament crossings, total duration) with what the analysis
//! predicted for the same file. Compensation averages over these records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::AnalysisResult;
use crate::error::GeniusError;

/// Maximum number of records kept; the oldest are evicted first.
pub const MAX_HISTORY_ITEMS: usize = 5;

/// Completion event payload from the host runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub path: String,
    /// Actual total print duration in seconds.
    #[serde(rename = "time", alias = "actualTotalTime")]
    pub actual_total_time: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub first_filament_print_time: f64,
    pub last_filament_print_time: f64,
    pub payload: CompletionPayload,
    /// Unix seconds at completion.
    pub timestamp: f64,
    pub analysis_print_time: f64,
    pub analysis_first_filament_print_time: f64,
    pub analysis_last_filament_print_time: f64,
}

impl HistoryRecord {
    /// Elapsed seconds before extrusion started.
    pub fn heat_up(&self) -> f64 {
        self.first_filament_print_time
    }

    /// Seconds between the last extrusion and the end of the job.
    pub fn cool_down(&self) -> f64 {
        self.payload.actual_total_time - self.last_filament_print_time
    }

    /// Actual over analyzed duration of the extrusion segment.
    ///
    /// `None` when the analyzed segment is empty or the ratio is not finite.
    pub fn scale(&self) -> Option<f64> {
        let predicted =
            self.analysis_last_filament_print_time - self.analysis_first_filament_print_time;
        if predicted == 0.0 {
            return None;
        }
        let ratio = (self.last_filament_print_time - self.first_filament_print_time) / predicted;
        ratio.is_finite().then_some(ratio)
    }
}

/// Calibration timestamps captured live while a job runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialHistory {
    pub first_filament_print_time: Option<f64>,
    pub last_filament_print_time: Option<f64>,
}

impl PartialHistory {
    /// Finish the record with the completion payload and the file's analysis.
    pub fn complete(
        self,
        payload: CompletionPayload,
        timestamp: f64,
        analysis: &AnalysisResult,
    ) -> Result<HistoryRecord, GeniusError> {
        let first = self
            .first_filament_print_time
            .ok_or(GeniusError::MissingMetadata("firstFilamentPrintTime"))?;
        let last = self
            .last_filament_print_time
            .ok_or(GeniusError::MissingMetadata("lastFilamentPrintTime"))?;
        let cal = analysis
            .calibration()
            .ok_or(GeniusError::MissingMetadata("analysis calibration fields"))?;
        Ok(HistoryRecord {
            first_filament_print_time: first,
            last_filament_print_time: last,
            payload,
            timestamp,
            analysis_print_time: cal.print_time,
            analysis_first_filament_print_time: cal.first_filament_print_time,
            analysis_last_filament_print_time: cal.last_filament_print_time,
        })
    }
}

/// Capped, most-recent-first record collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrintHistory {
    records: Vec<HistoryRecord>,
}

impl PrintHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records loaded from storage, restoring order and the cap.
    pub fn from_records(records: Vec<HistoryRecord>) -> Self {
        let mut h = Self { records };
        h.normalize();
        h
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a record, re-sort by timestamp (newest first) and evict beyond the cap.
    pub fn push(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.normalize();
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn normalize(&mut self) {
        self.records
            .sort_by(|a, b| b.timestamp.total_cmp(&a.timestamp));
        self.records.truncate(MAX_HISTORY_ITEMS);
    }
}
