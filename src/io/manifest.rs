//! Run manifest and per-dataset content hashes.
//!
//! The manifest is the last file a run writes. It goes through a temp file in
//! the same directory and is renamed into place, so a reader sees either the
//! previous manifest or the complete new one.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::domain::{AggregateTable, RunParams};
use crate::error::PipelineError;
use crate::io::snapshot::PROCESSED_DIR;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Where a source's data came from in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// `primary`, `primary_empty` or `synthetic`.
    pub provenance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub hashes: BTreeMap<String, String>,
    pub params: RunParams,
    pub rows: BTreeMap<String, usize>,
    pub run_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceRecord>,
}

impl Manifest {
    /// Row counts and hashes are taken from `datasets` as they are now.
    pub fn build<'a>(
        params: RunParams,
        datasets: impl IntoIterator<Item = &'a AggregateTable>,
        sources: BTreeMap<String, SourceRecord>,
        run_timestamp: DateTime<Utc>,
    ) -> Self {
        let mut rows = BTreeMap::new();
        let mut hashes = BTreeMap::new();
        for table in datasets {
            rows.insert(table.name().to_string(), table.len());
            hashes.insert(table.name().to_string(), content_hash(table));
        }
        Self {
            hashes,
            params,
            rows,
            run_timestamp,
            sources,
        }
    }

    /// Pretty JSON with every object's keys sorted.
    pub fn to_json(&self) -> Result<String, PipelineError> {
        // serde_json's map is ordered, so going through `Value` sorts nested keys too.
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Order-independent SHA-256 over row content; `""` for an empty table.
///
/// Each row's canonical text is hashed on its own, the row digests are sorted,
/// and the final digest covers the sorted list.
pub fn content_hash(table: &AggregateTable) -> String {
    if table.is_empty() {
        return String::new();
    }
    let mut digests: Vec<[u8; 32]> = table
        .rows()
        .iter()
        .map(|row| Sha256::digest(table.row_text(row).as_bytes()).into())
        .collect();
    digests.sort_unstable();

    let mut hasher = Sha256::new();
    for d in &digests {
        hasher.update(d);
    }
    hex::encode(hasher.finalize())
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(PROCESSED_DIR).join(MANIFEST_FILE)
}

/// Atomically replace `<root>/processed/manifest.json`.
pub fn write_manifest(root: &Path, manifest: &Manifest) -> Result<PathBuf, PipelineError> {
    let path = manifest_path(root);
    let dir = root.join(PROCESSED_DIR);
    fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;

    let json = manifest.to_json()?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| PipelineError::io(&dir, e))?;
    let tmp_path = tmp.path().to_path_buf();
    writeln!(tmp, "{json}").map_err(|e| PipelineError::io(&tmp_path, e))?;
    tmp.as_file().sync_all().map_err(|e| PipelineError::io(&tmp_path, e))?;
    tmp.persist(&path).map_err(|e| PipelineError::io(&path, e.error))?;

    info!(path = %path.display(), "wrote manifest");
    Ok(path)
}

pub fn read_manifest(root: &Path) -> Result<Manifest, PipelineError> {
    let path = manifest_path(root);
    let text = fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyAggregate, DateWindow, EntityId, IngestOptions};
    use chrono::{NaiveDate, TimeZone};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn row(day: u32, v: f64) -> DailyAggregate {
        DailyAggregate::new(d(day), EntityId::new("KATL")).with("m", Some(v))
    }

    fn params() -> RunParams {
        RunParams {
            entities: vec![EntityId::new("KATL")],
            window: DateWindow::new(d(1), d(3)).unwrap(),
            options: IngestOptions::default(),
        }
    }

    #[test]
    fn hash_ignores_row_order_but_not_content() {
        let mut a = AggregateTable::empty("t", &["m"]);
        a.push(row(1, 1.0));
        a.push(row(2, 2.0));
        let mut b = AggregateTable::empty("t", &["m"]);
        b.push(row(2, 2.0));
        b.push(row(1, 1.0));
        let mut c = AggregateTable::empty("t", &["m"]);
        c.push(row(1, 1.0));
        c.push(row(2, 2.5));

        assert_eq!(content_hash(&a), content_hash(&b));
        assert_ne!(content_hash(&a), content_hash(&c));
        assert_eq!(content_hash(&a).len(), 64);
        assert_eq!(content_hash(&AggregateTable::empty("t", &["m"])), "");
    }

    #[test]
    fn rows_match_table_lengths() {
        let mut a = AggregateTable::empty("flights_daily", &["m"]);
        a.push(row(1, 1.0));
        let empty = AggregateTable::empty("throughput_daily", &["m"]);
        let m = Manifest::build(params(), [&a, &empty], BTreeMap::new(), Utc::now());
        assert_eq!(m.rows["flights_daily"], a.len());
        assert_eq!(m.rows["throughput_daily"], 0);
        assert_eq!(m.hashes["throughput_daily"], "");
    }

    #[test]
    fn written_manifest_has_sorted_keys_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = BTreeMap::new();
        sources.insert(
            "weather".to_string(),
            SourceRecord {
                provenance: "synthetic".to_string(),
                reason: Some("offline".to_string()),
            },
        );
        let ts = Utc.with_ymd_and_hms(2024, 1, 4, 12, 0, 0).unwrap();
        let m = Manifest::build(params(), std::iter::empty::<&AggregateTable>(), sources, ts);

        let path = write_manifest(dir.path(), &m).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let keys: Vec<usize> = ["\"hashes\"", "\"params\"", "\"rows\"", "\"run_timestamp\"", "\"sources\""]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("\"run_timestamp\": \"2024-01-04T12:00:00Z\""));

        assert_eq!(read_manifest(dir.path()).unwrap(), m);
        // Only the manifest remains; the temp file was renamed away.
        assert_eq!(fs::read_dir(dir.path().join(PROCESSED_DIR)).unwrap().count(), 1);
    }
}
