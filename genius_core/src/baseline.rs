//! Fallback estimators used when no genius estimate is available.

use genius_traits::BaselineEstimator;

/// Extrapolates linearly from the fraction already printed.
///
/// `remaining = elapsed / progress - elapsed`; nothing before any progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearBaseline;

impl BaselineEstimator for LinearBaseline {
    fn estimate(&mut self, progress: f64, elapsed_secs: f64) -> Option<(f64, &'static str)> {
        if !(progress > 0.0 && progress.is_finite() && elapsed_secs.is_finite()) {
            return None;
        }
        let total = elapsed_secs / progress;
        Some(((total - elapsed_secs).max(0.0), "linear"))
    }
}

/// Never estimates; for hosts without a baseline of their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBaseline;

impl BaselineEstimator for NoBaseline {
    fn estimate(&mut self, _progress: f64, _elapsed_secs: f64) -> Option<(f64, &'static str)> {
        None
    }
}
