//! Raw per-day CSV partitions: `<root>/raw/<source>/<entity>/<YYYY-MM-DD>.csv`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{RawRecord, Source};
use crate::error::PipelineError;

pub const RAW_DIR: &str = "raw";

/// Partition directory name for national (entity-less) data.
pub const NATIONAL_PARTITION: &str = "national";

pub fn partition_dir(root: &Path, source: Source, entity: &str) -> PathBuf {
    root.join(RAW_DIR).join(source.name()).join(entity)
}

/// Write one CSV per calendar day found in `records`; returns the written paths.
///
/// Files are overwritten. A day without records gets no file.
pub fn write_partitions<'a, R: RawRecord + 'a>(
    root: &Path,
    source: Source,
    entity: &str,
    records: impl IntoIterator<Item = &'a R>,
) -> Result<Vec<PathBuf>, PipelineError> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&R>> = BTreeMap::new();
    for r in records {
        by_day.entry(r.date()).or_default().push(r);
    }
    if by_day.is_empty() {
        return Ok(Vec::new());
    }

    let dir = partition_dir(root, source, entity);
    fs::create_dir_all(&dir).map_err(|e| PipelineError::io(&dir, e))?;

    let mut written = Vec::with_capacity(by_day.len());
    for (day, rows) in by_day {
        let path = dir.join(format!("{day}.csv"));
        let mut writer = csv::Writer::from_path(&path).map_err(|e| PipelineError::csv(&path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| PipelineError::csv(&path, e))?;
        }
        writer
            .flush()
            .map_err(|e| PipelineError::io(&path, e))?;
        written.push(path);
    }
    debug!(%source, entity, files = written.len(), "wrote raw partitions");
    Ok(written)
}

/// Records of `records` that belong to `entity` (full or short code).
pub fn records_for<'a, R: RawRecord>(records: &'a [R], full: &str, short: &str) -> Vec<&'a R> {
    records.iter().filter(|r| r.belongs_to(full, short)).collect()
}
