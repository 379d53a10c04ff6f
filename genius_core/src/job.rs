//! Per-job glue between the host runtime and the estimator.

use genius_traits::{BaselineEstimator, Clock};

use crate::error::{GeniusError, Result};
use crate::estimator::GeniusEstimator;
use crate::history::{CompletionPayload, HistoryRecord};
use crate::store::{HistoryStore, MetadataStore, append_record};

/// Where a reported estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateSource {
    Genius,
    Baseline(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub remaining_secs: f64,
    pub source: EstimateSource,
}

/// Tracks one print from start to completion.
pub struct JobTracker<B> {
    origin: String,
    path: String,
    estimator: GeniusEstimator,
    baseline: B,
}

impl<B: BaselineEstimator> JobTracker<B> {
    /// Start tracking `origin`/`path`, loading its analysis from `metadata`.
    ///
    /// A store failure is logged and the job runs on the baseline alone.
    pub fn start<M: MetadataStore + ?Sized>(
        origin: &str,
        path: &str,
        metadata: &M,
        baseline: B,
    ) -> Self {
        let analysis = match metadata.analysis(origin, path) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, origin, path, "failed to read analysis");
                None
            }
        };
        if analysis.is_none() {
            tracing::info!(origin, path, "no analysis stored, using baseline estimates");
        }
        Self {
            origin: origin.to_owned(),
            path: path.to_owned(),
            estimator: GeniusEstimator::new(analysis),
            baseline,
        }
    }

    pub fn estimator(&self) -> &GeniusEstimator {
        &self.estimator
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Retry loading the analysis if none was available at start.
    pub fn refresh_analysis<M: MetadataStore + ?Sized>(&mut self, metadata: &M) {
        if self.estimator.analysis().is_some() {
            return;
        }
        match metadata.analysis(&self.origin, &self.path) {
            Ok(Some(a)) => {
                tracing::info!(origin = %self.origin, path = %self.path, "analysis attached");
                self.estimator.set_analysis(a);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read analysis"),
        }
    }

    /// Remaining time for one progress tick, genius first, baseline otherwise.
    pub fn estimate(&mut self, progress: f64, elapsed: f64) -> Option<Estimate> {
        let baseline = self.baseline.estimate(progress, elapsed);
        let genius = self.estimator.tick(progress, elapsed);
        tracing::debug!(
            elapsed,
            baseline = ?baseline.map(|(secs, _)| secs),
            genius = ?genius,
            progress,
            "estimate"
        );
        match (genius, baseline) {
            (Some(remaining_secs), _) => Some(Estimate {
                remaining_secs,
                source: EstimateSource::Genius,
            }),
            (None, Some((remaining_secs, label))) => Some(Estimate {
                remaining_secs,
                source: EstimateSource::Baseline(label),
            }),
            (None, None) => None,
        }
    }

    /// Complete the job and append a history record when calibration data
    /// is available. `Ok(None)` means nothing was recorded.
    pub fn finish<M, H, C>(
        self,
        payload: CompletionPayload,
        metadata: &M,
        history: &mut H,
        clock: &C,
    ) -> Result<Option<HistoryRecord>>
    where
        M: MetadataStore + ?Sized,
        H: HistoryStore + ?Sized,
        C: Clock + ?Sized,
    {
        let Some(analysis) = metadata.analysis(&payload.origin, &payload.path)? else {
            tracing::info!(path = %payload.path, "no analysis for finished print, not recording");
            return Ok(None);
        };
        let partial = self.estimator.into_partial();
        let record = match partial.complete(payload, clock.now_unix_secs(), &analysis) {
            Ok(r) => r,
            Err(e @ GeniusError::MissingMetadata(_)) => {
                tracing::info!(reason = %e, "incomplete calibration data, not recording");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        append_record(history, record.clone())?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisResult;
    use crate::baseline::{LinearBaseline, NoBaseline};
    use crate::map::ProgressMap;
    use crate::mocks::{MemoryHistoryStore, MemoryMetadataStore};
    use genius_traits::ManualClock;

    fn calibrated() -> AnalysisResult {
        let mut a = AnalysisResult {
            progress: Some(
                ProgressMap::try_from_pairs(&[
                    (0.0, 100.0),
                    (0.2, 80.0),
                    (0.8, 20.0),
                    (1.0, 0.0),
                ])
                .unwrap(),
            ),
            first_filament: Some(0.1),
            last_filament: Some(0.9),
            estimated_print_time: Some(100.0),
            ..Default::default()
        };
        a.calibrate().unwrap();
        a
    }

    #[test]
    fn falls_back_to_baseline_without_analysis() {
        let store = MemoryMetadataStore::new();
        let mut job = JobTracker::start("local", "a.gcode", &store, LinearBaseline);
        assert_eq!(job.estimate(0.0, 0.0), None);
        let e = job.estimate(0.5, 50.0).unwrap();
        assert_eq!(e.source, EstimateSource::Baseline("linear"));
        assert_eq!(e.remaining_secs, 50.0);
    }

    #[test]
    fn refresh_attaches_late_analysis() {
        let mut store = MemoryMetadataStore::new();
        let mut job = JobTracker::start("local", "a.gcode", &store, NoBaseline);
        assert_eq!(job.estimate(0.0, 0.0), None);
        store.set_analysis("local", "a.gcode", &calibrated()).unwrap();
        job.refresh_analysis(&store);
        let e = job.estimate(0.2, 15.0).unwrap();
        assert_eq!(e.source, EstimateSource::Genius);
        assert_eq!(e.remaining_secs, 80.0);
    }

    #[test]
    fn finish_records_calibrated_job() {
        let mut store = MemoryMetadataStore::new();
        store.set_analysis("local", "a.gcode", &calibrated()).unwrap();
        let mut job = JobTracker::start("local", "a.gcode", &store, NoBaseline);
        for (p, t) in [(0.0, 0.0), (0.2, 25.0), (0.8, 90.0), (1.0, 110.0)] {
            job.estimate(p, t);
        }
        let mut history = MemoryHistoryStore::default();
        let clock = ManualClock::new(1_700_000_000.0);
        let payload = CompletionPayload {
            origin: "local".into(),
            path: "a.gcode".into(),
            actual_total_time: 112.0,
            ..Default::default()
        };
        let rec = job
            .finish(payload, &store, &mut history, &clock)
            .unwrap()
            .unwrap();
        assert_eq!(rec.first_filament_print_time, 25.0);
        assert_eq!(rec.last_filament_print_time, 90.0);
        assert_eq!(rec.timestamp, 1_700_000_000.0);
        assert_eq!(history.saves, 1);
        assert_eq!(history.history.len(), 1);
    }

    #[test]
    fn finish_without_timestamps_records_nothing() {
        let mut store = MemoryMetadataStore::new();
        store.set_analysis("local", "a.gcode", &calibrated()).unwrap();
        let job = JobTracker::start("local", "a.gcode", &store, NoBaseline);
        let mut history = MemoryHistoryStore::default();
        let payload = CompletionPayload {
            origin: "local".into(),
            path: "a.gcode".into(),
            actual_total_time: 10.0,
            ..Default::default()
        };
        let out = job
            .finish(payload, &store, &mut history, &ManualClock::new(0.0))
            .unwrap();
        assert!(out.is_none());
        assert_eq!(history.saves, 0);
    }
}
