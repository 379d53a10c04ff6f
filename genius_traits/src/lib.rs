pub mod clock;

pub use clock::manual::ManualClock;
pub use clock::{Clock, SystemClock};

use std::path::Path;

/// An offline analyzer run against one instruction file.
///
/// Returns the raw standard output; interpreting it (trace lines or a JSON
/// object) is left to the caller.
pub trait Analyzer {
    fn name(&self) -> &str;
    fn run(&self, gcode: &Path) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// The host's default remaining-time estimator, used whenever no genius
/// estimate is available for a tick.
///
/// Returns `(remaining_secs, label)`.
pub trait BaselineEstimator {
    fn estimate(&mut self, progress: f64, elapsed_secs: f64) -> Option<(f64, &'static str)>;
}

impl<T: Analyzer + ?Sized> Analyzer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, gcode: &Path) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).run(gcode)
    }
}

impl<T: BaselineEstimator + ?Sized> BaselineEstimator for Box<T> {
    fn estimate(&mut self, progress: f64, elapsed_secs: f64) -> Option<(f64, &'static str)> {
        (**self).estimate(progress, elapsed_secs)
    }
}
