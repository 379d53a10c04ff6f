#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Remaining print time estimation (host-agnostic).
//!
//! Everything that touches the outside world goes through the
//! `genius_traits` capabilities (`Analyzer`, `BaselineEstimator`, `Clock`)
//! and the [`store`] traits.
//!
//! ## Architecture
//!
//! - **Trace parsing**: analyzer trace lines to samples (`trace`)
//! - **Map building**: density-filtered remaining-time map with the
//!   filament knots always kept (`builder`)
//! - **Interpolation**: piecewise-linear lookup (`interpolate`)
//! - **Compensation**: history-averaged heat-up, cool-down and scale (`compensation`)
//! - **Estimation**: per-job cursor/anchor state machine (`estimator`, `job`)
//! - **Pipeline**: analyzer orchestration and merge (`pipeline`)
//!
//! A progress map maps file position in `[0, 1]` to remaining seconds.

pub mod analysis;
pub mod baseline;
pub mod builder;
pub mod compensation;
pub mod error;
pub mod estimator;
pub mod history;
pub mod interpolate;
pub mod job;
pub mod map;
pub mod mocks;
pub mod pipeline;
pub mod store;
pub mod trace;

pub use analysis::AnalysisResult;
pub use baseline::{LinearBaseline, NoBaseline};
pub use builder::{BuildOptions, DEFAULT_MIN_INTERVAL_SECS};
pub use compensation::{CompensationStats, compensate, compensate_or_passthrough};
pub use error::{GeniusError, Report, Result};
pub use estimator::{EstimatorPhase, GeniusEstimator};
pub use history::{CompletionPayload, HistoryRecord, MAX_HISTORY_ITEMS, PrintHistory};
pub use interpolate::interpolate;
pub use job::{Estimate, EstimateSource, JobTracker};
pub use map::{ProgressMap, ProgressPoint};
pub use pipeline::{AnalysisPipeline, AnalysisReport};
pub use store::{HistoryStore, MetadataStore};
pub use trace::{Trace, TraceSample, parse_trace};
