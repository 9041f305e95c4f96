//! Daily aggregate snapshots: `<root>/processed/<dataset>.csv`.
//!
//! Header is `date,entity,<metrics...>`; null cells are written empty.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{AggregateTable, DATE_COLUMN, DailyAggregate, ENTITY_COLUMN, EntityId};
use crate::error::{PipelineError, ShapeError};

pub const PROCESSED_DIR: &str = "processed";

pub fn snapshot_path(root: &Path, dataset: &str) -> PathBuf {
    root.join(PROCESSED_DIR).join(format!("{dataset}.csv"))
}

pub fn write_snapshot(root: &Path, table: &AggregateTable) -> Result<PathBuf, PipelineError> {
    let path = snapshot_path(root, table.name());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }

    let mut writer = csv::Writer::from_path(&path).map_err(|e| PipelineError::csv(&path, e))?;
    writer
        .write_record(table.columns())
        .map_err(|e| PipelineError::csv(&path, e))?;
    for row in table.rows() {
        let mut record = vec![row.date.to_string(), row.entity.to_string()];
        record.extend(
            table
                .metric_columns()
                .iter()
                .map(|c| row.metric(c).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record).map_err(|e| PipelineError::csv(&path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(&path, e))?;

    debug!(dataset = table.name(), rows = table.len(), path = %path.display(), "wrote snapshot");
    Ok(path)
}

/// Read a snapshot back into an aggregate named `dataset`.
///
/// Every column other than `date` and `entity` is a metric.
pub fn read_snapshot(root: &Path, dataset: &str) -> Result<AggregateTable, PipelineError> {
    let path = snapshot_path(root, dataset);
    let mut reader = csv::Reader::from_path(&path).map_err(|e| PipelineError::csv(&path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::csv(&path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| ShapeError::MissingColumn {
                dataset: dataset.to_string(),
                column: column.to_string(),
            })
    };
    let date_idx = position(DATE_COLUMN)?;
    let entity_idx = position(ENTITY_COLUMN)?;
    let metrics: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx && *i != entity_idx)
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let invalid = |column: &str, value: &str, line: usize| ShapeError::InvalidValue {
        dataset: dataset.to_string(),
        column: column.to_string(),
        value: value.to_string(),
        line,
    };

    let mut table = AggregateTable::with_columns(dataset, metrics.iter().map(|(_, c)| c.clone()).collect());
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PipelineError::csv(&path, e))?;
        let line = i + 2;
        let date_text = record.get(date_idx).unwrap_or_default().trim();
        let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d")
            .map_err(|_| invalid(DATE_COLUMN, date_text, line))?;
        let entity = EntityId::new(record.get(entity_idx).unwrap_or_default());

        let mut row = DailyAggregate::new(date, entity);
        for (idx, column) in &metrics {
            let text = record.get(*idx).unwrap_or_default().trim();
            let value = if text.is_empty() {
                None
            } else {
                Some(text.parse::<f64>().map_err(|_| invalid(column, text, line))?)
            };
            row = row.with(column, value);
        }
        table.push(row);
    }
    Ok(table)
}
