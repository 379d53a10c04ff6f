//! JSON file stores.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use eyre::WrapErr;
use genius_core::error::Result;
use genius_core::history::{HistoryRecord, PrintHistory};
use genius_core::store::{HistoryStore, MetadataStore};
use genius_core::AnalysisResult;

/// Sidecar suffix for analysis results stored next to the G-code file.
pub const SIDECAR_SUFFIX: &str = ".genius.json";

pub fn sidecar_path(gcode: &Path) -> PathBuf {
    let mut s = gcode.as_os_str().to_owned();
    s.push(SIDECAR_SUFFIX);
    PathBuf::from(s)
}

/// Write `bytes` to a sibling temp file and rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("not a file path: {:?}", path))?;
    let mut tmp_name = name.to_owned();
    tmp_name.push(format!(".tmp{}", std::process::id()));
    let tmp = dir.join(tmp_name);

    let mut f = fs::File::create(&tmp).wrap_err_with(|| format!("create {}", tmp.display()))?;
    f.write_all(bytes)
        .and_then(|()| f.sync_all())
        .wrap_err_with(|| format!("write {}", tmp.display()))?;
    drop(f);
    fs::rename(&tmp, path).wrap_err_with(|| format!("replace {}", path.display()))?;
    Ok(())
}

/// Print history kept in a single JSON array file.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileHistoryStore {
    /// A missing file is an empty history. Records that fail to decode are
    /// logged and dropped one by one so the rest survive the next save; a
    /// file that is not a JSON array at all is treated as empty.
    fn load(&self) -> Result<PrintHistory> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PrintHistory::new()),
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("read {}", self.path.display()));
            }
        };
        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&text) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "print history is unreadable, starting empty"
                );
                return Ok(PrintHistory::new());
            }
        };
        let total = entries.len();
        let records: Vec<HistoryRecord> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                serde_json::from_value(entry)
                    .map_err(|e| {
                        tracing::warn!(
                            error = %e,
                            index,
                            path = %self.path.display(),
                            "dropping undecodable history record"
                        );
                    })
                    .ok()
            })
            .collect();
        if records.len() < total {
            tracing::warn!(
                kept = records.len(),
                dropped = total - records.len(),
                "print history partially recovered"
            );
        }
        Ok(PrintHistory::from_records(records))
    }

    fn save(&mut self, history: &PrintHistory) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(history)?;
        write_atomic(&self.path, &bytes)
    }
}

/// Analysis results stored as `<gcode>.genius.json`. The origin is ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileMetadataStore;

impl MetadataStore for FileMetadataStore {
    fn analysis(&self, _origin: &str, path: &str) -> Result<Option<AnalysisResult>> {
        let sidecar = sidecar_path(Path::new(path));
        match fs::read_to_string(&sidecar) {
            Ok(text) => Ok(Some(read_analysis(&text, &sidecar)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).wrap_err_with(|| format!("read {}", sidecar.display())),
        }
    }

    fn set_analysis(&mut self, _origin: &str, path: &str, analysis: &AnalysisResult) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(analysis)?;
        write_atomic(&sidecar_path(Path::new(path)), &bytes)
    }
}

/// Serves one analysis for every file; used to replay a saved result.
#[derive(Debug, Clone)]
pub struct FixedMetadataStore(pub AnalysisResult);

impl MetadataStore for FixedMetadataStore {
    fn analysis(&self, _origin: &str, _path: &str) -> Result<Option<AnalysisResult>> {
        Ok(Some(self.0.clone()))
    }

    fn set_analysis(&mut self, _origin: &str, _path: &str, analysis: &AnalysisResult) -> Result<()> {
        self.0 = analysis.clone();
        Ok(())
    }
}

/// Decode an analysis result JSON document.
pub fn read_analysis(text: &str, origin: &Path) -> Result<AnalysisResult> {
    let value: serde_json::Value = serde_json::from_str(text)
        .wrap_err_with(|| format!("parse analysis {}", origin.display()))?;
    let serde_json::Value::Object(map) = value else {
        eyre::bail!("analysis {} is not a JSON object", origin.display());
    };
    Ok(AnalysisResult::from_fragment(map)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genius_core::history::CompletionPayload;

    fn record(ts: f64) -> HistoryRecord {
        HistoryRecord {
            first_filament_print_time: 1.0,
            last_filament_print_time: 2.0,
            payload: CompletionPayload {
                actual_total_time: 3.0,
                ..Default::default()
            },
            timestamp: ts,
            analysis_print_time: 3.0,
            analysis_first_filament_print_time: 1.0,
            analysis_last_filament_print_time: 2.0,
        }
    }

    #[test]
    fn history_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileHistoryStore::new(dir.path().join("h.json"));
        assert!(store.load().unwrap().is_empty());
        let mut h = PrintHistory::new();
        h.push(record(1.0));
        h.push(record(2.0));
        store.save(&h).unwrap();
        assert_eq!(store.load().unwrap(), h);
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn corrupt_history_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileHistoryStore::new(path).load().unwrap().is_empty());
    }

    #[test]
    fn bad_record_does_not_take_the_rest_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        let mut broken = serde_json::to_value(record(3.0)).unwrap();
        broken["payload"]
            .as_object_mut()
            .unwrap()
            .remove("time");
        let file = serde_json::json!([
            serde_json::to_value(record(1.0)).unwrap(),
            broken,
            serde_json::to_value(record(2.0)).unwrap(),
        ]);
        fs::write(&path, file.to_string()).unwrap();

        let mut store = FileHistoryStore::new(&path);
        let loaded = store.load().unwrap();
        let ts: Vec<f64> = loaded.records().iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![2.0, 1.0]);

        let after = genius_core::store::append_record(&mut store, record(4.0)).unwrap();
        assert_eq!(after.len(), 3);
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[test]
    fn sidecar_sits_next_to_gcode() {
        assert_eq!(
            sidecar_path(Path::new("/x/part.gcode")),
            PathBuf::from("/x/part.gcode.genius.json")
        );
    }
}
