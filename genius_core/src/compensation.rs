//! History-based correction of a freshly built progress map.
//!
//! The analyzer models the extrusion segment reasonably well but knows
//! nothing about how long this particular printer takes to heat up or cool
//! down, and its motion model is usually off by a roughly constant factor.
//! Past prints give us all three numbers:
//!
//! ```text
//! new_value = (value - tail_remaining) * avg_scale + avg_cool_down
//! ```
//!
//! for every point in `[firstFilament, lastFilament)`, followed by a new
//! origin at `first + avg_heat_up` and the usual `(1, 0)` terminal point.

use crate::analysis::AnalysisResult;
use crate::error::GeniusError;
use crate::history::HistoryRecord;
use crate::interpolate::interpolate;
use crate::map::{ProgressMap, ProgressPoint};

/// Averages over the history window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompensationStats {
    pub avg_heat_up: f64,
    pub avg_cool_down: f64,
    pub avg_scale: f64,
    pub samples: usize,
}

impl CompensationStats {
    /// Average the per-record quantities. `Ok(None)` when there is no history.
    ///
    /// A record whose analyzed extrusion segment has zero length makes the
    /// whole window unusable.
    pub fn from_history(records: &[HistoryRecord]) -> Result<Option<Self>, GeniusError> {
        if records.is_empty() {
            return Ok(None);
        }
        let n = records.len() as f64;
        let mut heat_up = 0.0;
        let mut cool_down = 0.0;
        let mut scale = 0.0;
        for (index, r) in records.iter().enumerate() {
            heat_up += r.heat_up();
            cool_down += r.cool_down();
            scale += r.scale().ok_or(GeniusError::DivisionDegenerate { index })?;
        }
        let stats = Self {
            avg_heat_up: heat_up / n,
            avg_cool_down: cool_down / n,
            avg_scale: scale / n,
            samples: records.len(),
        };
        tracing::info!(
            heat_up_secs = ?records.iter().map(HistoryRecord::heat_up).collect::<Vec<_>>(),
            cool_down_secs = ?records.iter().map(HistoryRecord::cool_down).collect::<Vec<_>>(),
            avg_heat_up = stats.avg_heat_up,
            avg_cool_down = stats.avg_cool_down,
            avg_scale = stats.avg_scale,
            "compensation statistics"
        );
        Ok(Some(stats))
    }
}

/// Rewrite the map of `analysis` from `stats`.
pub fn apply(
    analysis: &AnalysisResult,
    stats: &CompensationStats,
) -> Result<AnalysisResult, GeniusError> {
    let map = analysis
        .progress
        .as_ref()
        .ok_or(GeniusError::MissingMetadata("progress"))?;
    let first = analysis
        .first_filament
        .ok_or(GeniusError::MissingMetadata("firstFilament"))?;
    let last = analysis
        .last_filament
        .ok_or(GeniusError::MissingMetadata("lastFilament"))?;

    let tail = interpolate(map.points(), last)?.value;
    let mut points: Vec<ProgressPoint> = map
        .points()
        .iter()
        .filter(|p| p.position >= first && p.position < last)
        .map(|p| {
            let value = (p.value - tail) * stats.avg_scale + stats.avg_cool_down;
            ProgressPoint::new(p.position, value)
        })
        .collect();
    let Some(head) = points.first().copied() else {
        return Err(GeniusError::MalformedMap(format!(
            "no points between firstFilament {first} and lastFilament {last}"
        )));
    };
    // An extrusion segment starting at 0 would otherwise collide with the new origin.
    if head.position == 0.0 {
        points.remove(0);
    }
    points.insert(0, ProgressPoint::new(0.0, head.value + stats.avg_heat_up));
    points.push(ProgressPoint::new(1.0, 0.0));

    let progress = ProgressMap::from_points(points);
    progress.validate()?;
    let estimated = progress.first().map(|p| p.value);
    Ok(AnalysisResult {
        progress: Some(progress),
        estimated_print_time: estimated,
        ..analysis.clone()
    })
}

/// Compensate `analysis` against `history`; identity for an empty history.
pub fn compensate(
    analysis: &AnalysisResult,
    history: &[HistoryRecord],
) -> Result<AnalysisResult, GeniusError> {
    match CompensationStats::from_history(history)? {
        None => Ok(analysis.clone()),
        Some(stats) => apply(analysis, &stats),
    }
}

/// Like [`compensate`], but any failure logs a warning and keeps the
/// uncompensated result.
pub fn compensate_or_passthrough(
    analysis: &AnalysisResult,
    history: &[HistoryRecord],
) -> AnalysisResult {
    match compensate(analysis, history) {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(
                error = %e,
                records = history.len(),
                "failed to compensate, using uncompensated map"
            );
            analysis.clone()
        }
    }
}
