//! Live remaining-time estimation for one print job.
//!
//! The estimator walks a cursor forward through the progress map as the
//! print advances. Each time the cursor moves it re-anchors the predicted
//! total duration (`remaining at progress + elapsed`); between moves the
//! reported remaining time simply counts down from that anchor, which keeps
//! the display smooth even when progress updates are coarse.
//!
//! Along the way it records the elapsed time at which the print crossed the
//! first and last filament positions; those feed the next compensation.

use crate::analysis::AnalysisResult;
use crate::error::GeniusError;
use crate::history::PartialHistory;
use crate::interpolate::interpolate;

/// Estimator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorPhase {
    /// No tick seen yet; the next one is treated as progress 0.
    BeforeFirstSample,
    /// Following the print.
    Tracking,
}

/// Per-job estimator state.
#[derive(Debug, Clone)]
pub struct GeniusEstimator {
    analysis: Option<AnalysisResult>,
    phase: EstimatorPhase,
    /// Index of the map point last used for the anchor; `None` until in range.
    cursor: Option<usize>,
    /// Predicted total duration in seconds.
    anchor: Option<f64>,
    partial: PartialHistory,
}

impl GeniusEstimator {
    pub fn new(analysis: Option<AnalysisResult>) -> Self {
        Self {
            analysis,
            phase: EstimatorPhase::BeforeFirstSample,
            cursor: None,
            anchor: None,
            partial: PartialHistory::default(),
        }
    }

    /// Attach an analysis that became available after the job started.
    /// The cursor restarts from the origin of the new map.
    pub fn set_analysis(&mut self, analysis: AnalysisResult) {
        self.analysis = Some(analysis);
        self.cursor = None;
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn phase(&self) -> EstimatorPhase {
        self.phase
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn anchor(&self) -> Option<f64> {
        self.anchor
    }

    /// Calibration timestamps harvested so far.
    pub fn partial(&self) -> &PartialHistory {
        &self.partial
    }

    pub fn into_partial(self) -> PartialHistory {
        self.partial
    }

    /// Process one tick and return the remaining seconds, or `None` when the
    /// caller should use its own estimate. Never fails.
    pub fn tick(&mut self, progress: f64, elapsed: f64) -> Option<f64> {
        match self.try_tick(progress, elapsed) {
            Ok(remaining) => remaining,
            Err(e) if e.is_expected() => {
                tracing::trace!(reason = %e, progress, elapsed, "no genius estimate");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, progress, elapsed, "failed to estimate, ignoring");
                None
            }
        }
    }

    fn try_tick(&mut self, progress: f64, elapsed: f64) -> Result<Option<f64>, GeniusError> {
        let progress = match self.phase {
            EstimatorPhase::BeforeFirstSample => {
                self.phase = EstimatorPhase::Tracking;
                0.0
            }
            EstimatorPhase::Tracking => progress,
        };
        let analysis = self
            .analysis
            .as_ref()
            .ok_or(GeniusError::MissingMetadata("analysis"))?;
        let map = analysis
            .progress
            .as_ref()
            .ok_or(GeniusError::MissingMetadata("progress"))?;
        let points = map.points();

        let mut next = self.cursor;
        loop {
            let candidate = next.map_or(0, |i| i + 1);
            match points.get(candidate) {
                Some(p) if progress >= p.position => next = Some(candidate),
                _ => break,
            }
        }
        if next.is_none() {
            return Ok(None);
        }

        if next != self.cursor {
            if let Some(first) = analysis.first_filament
                && progress > first
                && self.partial.first_filament_print_time.is_none()
            {
                self.partial.first_filament_print_time = Some(elapsed);
            }
            if self.partial.last_filament_print_time.is_none()
                || analysis.last_filament.is_some_and(|last| progress <= last)
            {
                self.partial.last_filament_print_time = Some(elapsed);
            }
            match interpolate(points, progress) {
                Ok(p) => {
                    self.anchor = Some(p.value + elapsed);
                    self.cursor = next;
                }
                // Keep the old cursor so the next tick retries the lookup.
                Err(e @ GeniusError::OutOfRange { .. }) => {
                    tracing::debug!(reason = %e, "progress outside map, keeping anchor");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.anchor.map(|total| total - elapsed))
    }
}
