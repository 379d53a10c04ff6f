//! Stored per-file analysis result.
//!
//! Analyzer output is merged as loose JSON first (every analyzer may add
//! arbitrary keys) and only then read into the typed [`AnalysisResult`].
//! Unknown keys are kept in `extra` so persisting the result loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GeniusError;
use crate::interpolate::interpolate;
use crate::map::ProgressMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_filament: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_filament: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_print_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_print_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_first_filament_print_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_last_filament_print_time: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The three calibration values copied into a history record at completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisCalibration {
    pub print_time: f64,
    pub first_filament_print_time: f64,
    pub last_filament_print_time: f64,
}

/// Merge `fragment` into `base`, keys in `fragment` overriding.
pub fn merge_fragment(base: &mut Map<String, Value>, fragment: Map<String, Value>) {
    base.extend(fragment);
}

impl AnalysisResult {
    /// Read a merged JSON object into a typed result.
    pub fn from_fragment(merged: Map<String, Value>) -> Result<Self, GeniusError> {
        let result: Self = serde_json::from_value(Value::Object(merged))
            .map_err(|e| GeniusError::MalformedMap(format!("analysis result: {e}")))?;
        if let Some(map) = &result.progress {
            map.validate()?;
        }
        Ok(result)
    }

    /// Whether the inputs for calibration and compensation are present.
    pub fn has_progress_inputs(&self) -> bool {
        self.progress.is_some() && self.first_filament.is_some() && self.last_filament.is_some()
    }

    /// Calibration fields, if a previous [`AnalysisResult::calibrate`] filled them.
    pub fn calibration(&self) -> Option<AnalysisCalibration> {
        Some(AnalysisCalibration {
            print_time: self.analysis_print_time?,
            first_filament_print_time: self.analysis_first_filament_print_time?,
            last_filament_print_time: self.analysis_last_filament_print_time?,
        })
    }

    /// Derive the analyzed elapsed times at the two filament positions.
    ///
    /// `analysisPrintTime` snapshots `estimatedPrintTime` before compensation
    /// rewrites it; the filament times are that total minus the remaining
    /// time the map predicts at each position.
    pub fn calibrate(&mut self) -> Result<(), GeniusError> {
        let (Some(map), Some(first), Some(last)) =
            (&self.progress, self.first_filament, self.last_filament)
        else {
            return Err(GeniusError::MissingMetadata(
                "progress, firstFilament and lastFilament",
            ));
        };
        let total = self
            .estimated_print_time
            .ok_or(GeniusError::MissingMetadata("estimatedPrintTime"))?;
        let first_remaining = interpolate(map.points(), first)?.value;
        let last_remaining = interpolate(map.points(), last)?.value;
        self.analysis_print_time = Some(total);
        self.analysis_first_filament_print_time = Some(total - first_remaining);
        self.analysis_last_filament_print_time = Some(total - last_remaining);
        Ok(())
    }
}
