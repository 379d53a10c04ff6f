//! Persistence seams owned by the host.

use crate::analysis::AnalysisResult;
use crate::error::Result;
use crate::history::{HistoryRecord, PrintHistory};

/// Per-file metadata store holding the analysis result.
pub trait MetadataStore {
    fn analysis(&self, origin: &str, path: &str) -> Result<Option<AnalysisResult>>;
    fn set_analysis(&mut self, origin: &str, path: &str, analysis: &AnalysisResult) -> Result<()>;
}

/// Settings store holding the print history.
///
/// `save` must replace the stored history as a whole; readers never see a
/// partially written list.
pub trait HistoryStore {
    fn load(&self) -> Result<PrintHistory>;
    fn save(&mut self, history: &PrintHistory) -> Result<()>;
}

/// Read, append, truncate, persist.
pub fn append_record<H: HistoryStore + ?Sized>(
    store: &mut H,
    record: HistoryRecord,
) -> Result<PrintHistory> {
    let mut history = store.load()?;
    history.push(record);
    store.save(&history)?;
    tracing::info!(records = history.len(), "print history updated");
    Ok(history)
}
