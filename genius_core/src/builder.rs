//! Offline progress-map construction from an analyzer trace.
//!
//! The raw trace has one sample per instruction and is far too dense to
//! store. The builder keeps a sample only when enough simulated time has
//! passed since the previously kept one, but always keeps the samples at
//! the first and last filament positions since compensation and live
//! calibration anchor on them.

use serde_json::{Map, Value};

use crate::error::GeniusError;
use crate::map::{ProgressMap, ProgressPoint};
use crate::trace::{Trace, TraceSample};

/// Default minimum simulated time between two kept samples.
pub const DEFAULT_MIN_INTERVAL_SECS: f64 = 60.0;

/// Tuning for [`build_progress_map`].
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Minimum elapsed seconds between two kept samples.
    pub min_interval_secs: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
        }
    }
}

/// Output of the builder for one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltMap {
    pub progress: ProgressMap,
    /// Position of the first extruding sample; `None` if nothing extrudes.
    pub first_filament: Option<f64>,
    /// Position where cumulative filament first reaches its maximum.
    pub last_filament: Option<f64>,
    /// Elapsed time of the final sample.
    pub estimated_print_time: f64,
}

impl BuiltMap {
    /// Render as a JSON fragment ready to merge into an analysis result.
    pub fn into_fragment(self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            "progress".into(),
            serde_json::to_value(&self.progress).unwrap_or(Value::Null),
        );
        out.insert("firstFilament".into(), opt_number(self.first_filament));
        out.insert("lastFilament".into(), opt_number(self.last_filament));
        out.insert(
            "estimatedPrintTime".into(),
            opt_number(Some(self.estimated_print_time)),
        );
        out
    }
}

fn opt_number(v: Option<f64>) -> Value {
    v.and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Locate the first/last filament calibration positions.
///
/// The last position is where the running maximum last strictly increased,
/// so a trace that retracts after its final extrusion still reports the
/// extrusion point.
pub fn filament_bounds(samples: &[TraceSample]) -> (Option<f64>, Option<f64>) {
    let first = samples.iter().find(|s| s.filament > 0.0).map(|s| s.position);
    if first.is_none() {
        return (None, None);
    }
    let mut max: Option<f64> = None;
    let mut last = None;
    for s in samples {
        if max.is_none_or(|m| s.filament > m) {
            max = Some(s.filament);
            last = Some(s.position);
        }
    }
    (first, last)
}

/// Downsample trace samples into a strictly increasing remaining-time map.
pub fn build_progress_map(
    samples: &[TraceSample],
    opts: BuildOptions,
) -> Result<BuiltMap, GeniusError> {
    let Some(final_sample) = samples.last() else {
        return Err(GeniusError::Trace {
            line: 0,
            reason: "trace contains no progress samples".into(),
        });
    };
    let total = final_sample.elapsed;
    let (first_filament, last_filament) = filament_bounds(samples);

    let mut points = Vec::with_capacity(samples.len().min(1024) + 2);
    points.push(ProgressPoint::new(0.0, total));
    let mut last_kept_elapsed = f64::NEG_INFINITY;
    for s in samples {
        let is_knot = Some(s.position) == first_filament || Some(s.position) == last_filament;
        let due = last_kept_elapsed + opts.min_interval_secs < s.elapsed;
        if !(due || is_knot) {
            continue;
        }
        // A qualifying sample restarts the spacing window even when its
        // position is dropped below.
        last_kept_elapsed = s.elapsed;
        // Keep the map strictly increasing: the origin and terminal points own
        // positions 0 and 1, and the first sample seen at a position wins.
        let prev = points.last().map_or(0.0, |p| p.position);
        if s.position <= prev || s.position >= 1.0 {
            continue;
        }
        points.push(ProgressPoint::new(s.position, total - s.elapsed));
    }
    points.push(ProgressPoint::new(1.0, 0.0));

    tracing::debug!(
        samples = samples.len(),
        kept = points.len(),
        total_secs = total,
        "built progress map"
    );
    Ok(BuiltMap {
        progress: ProgressMap::from_points(points),
        first_filament,
        last_filament,
        estimated_print_time: total,
    })
}

/// Turn a parsed trace into an analysis fragment.
///
/// `Analysis:` metadata goes in first so the built keys win on conflict. A
/// trace with metadata but no samples yields just the metadata.
pub fn fragment_from_trace(
    trace: Trace,
    opts: BuildOptions,
) -> Result<Map<String, Value>, GeniusError> {
    let Trace {
        samples,
        mut analysis,
    } = trace;
    if samples.is_empty() {
        if analysis.is_empty() {
            return Err(GeniusError::Trace {
                line: 0,
                reason: "trace is empty".into(),
            });
        }
        return Ok(analysis);
    }
    let built = build_progress_map(&samples, opts)?;
    analysis.extend(built.into_fragment());
    Ok(analysis)
}
