//! Append-only structured log of ingest runs (`<root>/logs/ingest.log`).
//!
//! One JSON object per line, keys sorted.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "ingest.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunResult {
    Ok,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestEvent {
    pub timestamp: DateTime<Utc>,
    pub entities: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub rows: BTreeMap<String, usize>,
    pub duration_seconds: f64,
    pub result: RunResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn log_path(root: &Path) -> PathBuf {
    root.join(LOG_DIR).join(LOG_FILE)
}

pub fn append_event(root: &Path, event: &IngestEvent) -> Result<(), PipelineError> {
    let path = log_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let line = serde_json::to_string(&serde_json::to_value(event)?)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| PipelineError::io(&path, e))?;
    writeln!(file, "{line}").map_err(|e| PipelineError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut event = IngestEvent {
            timestamp: Utc::now(),
            entities: vec!["KATL".to_string()],
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            rows: BTreeMap::from([("flights_daily".to_string(), 3)]),
            duration_seconds: 0.5,
            result: RunResult::Ok,
            error: None,
        };
        append_event(dir.path(), &event).unwrap();
        event.result = RunResult::Fail;
        event.error = Some("boom".to_string());
        append_event(dir.path(), &event).unwrap();

        let text = fs::read_to_string(log_path(dir.path())).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"result\":\"OK\""));
        assert!(!lines[0].contains("error"));
        let second: IngestEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.result, RunResult::Fail);
        assert_eq!(second.error.as_deref(), Some("boom"));
    }
}
