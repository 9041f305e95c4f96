//! Canonical daily aggregates.
//!
//! An `AggregateTable` is a small column-oriented view over `DailyAggregate`
//! rows: two fixed key columns (`date`, `entity`) followed by the dataset's
//! declared metric columns. A metric that is absent or NaN on a row is a null
//! cell.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::EntityId;

pub const DATE_COLUMN: &str = "date";
pub const ENTITY_COLUMN: &str = "entity";

/// One row per (date, entity) per source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub entity: EntityId,
    pub metrics: BTreeMap<String, Option<f64>>,
}

impl DailyAggregate {
    pub fn new(date: NaiveDate, entity: EntityId) -> Self {
        Self {
            date,
            entity,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with(mut self, column: &str, value: Option<f64>) -> Self {
        self.metrics.insert(column.to_string(), value);
        self
    }

    /// Metric value; `None` for absent, null, or NaN cells.
    pub fn metric(&self, column: &str) -> Option<f64> {
        self.metrics
            .get(column)
            .copied()
            .flatten()
            .filter(|v| !v.is_nan())
    }

    /// Text form of any column, used for duplicate keys and hashing.
    pub fn cell_text(&self, column: &str) -> String {
        match column {
            DATE_COLUMN => self.date.to_string(),
            ENTITY_COLUMN => self.entity.to_string(),
            other => self
                .metric(other)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "null".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    name: String,
    metric_columns: Vec<String>,
    rows: Vec<DailyAggregate>,
}

impl AggregateTable {
    /// Empty table with the given metric columns (key columns are implicit).
    pub fn empty(name: impl Into<String>, metric_columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            metric_columns: metric_columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_columns(name: impl Into<String>, metric_columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            metric_columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: DailyAggregate) {
        self.rows.push(row);
    }

    /// Sort rows by (date, entity) for stable output.
    pub fn sort(&mut self) {
        self.rows
            .sort_by(|a, b| (a.date, &a.entity).cmp(&(b.date, &b.entity)));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[DailyAggregate] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn metric_columns(&self) -> &[String] {
        &self.metric_columns
    }

    /// All column names: key columns first, then metrics in declaration order.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = vec![DATE_COLUMN.to_string(), ENTITY_COLUMN.to_string()];
        cols.extend(self.metric_columns.iter().cloned());
        cols
    }

    pub fn has_column(&self, column: &str) -> bool {
        column == DATE_COLUMN
            || column == ENTITY_COLUMN
            || self.metric_columns.iter().any(|c| c == column)
    }

    /// Values of a metric column, or `None` if the column is not declared.
    pub fn metric_values(&self, column: &str) -> Option<Vec<Option<f64>>> {
        if !self.metric_columns.iter().any(|c| c == column) {
            return None;
        }
        Some(self.rows.iter().map(|r| r.metric(column)).collect())
    }

    /// Total and null cell counts over every declared column.
    pub fn null_cells(&self) -> (usize, usize) {
        let total = self.rows.len() * (self.metric_columns.len() + 2);
        let nulls = self
            .rows
            .iter()
            .map(|r| {
                self.metric_columns
                    .iter()
                    .filter(|c| r.metric(c).is_none())
                    .count()
            })
            .sum();
        (total, nulls)
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).max()
    }

    /// Canonical text of one row, used for content hashing.
    pub fn row_text(&self, row: &DailyAggregate) -> String {
        self.columns()
            .iter()
            .map(|c| format!("{c}={}", row.cell_text(c)))
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn null_cells_count_missing_and_nan_metrics() {
        let mut t = AggregateTable::empty("t", &["a", "b"]);
        t.push(DailyAggregate::new(d(1), EntityId::new("KATL")).with("a", Some(1.0)));
        t.push(
            DailyAggregate::new(d(2), EntityId::new("KATL"))
                .with("a", Some(f64::NAN))
                .with("b", Some(2.0)),
        );
        // 2 rows x 4 columns; row 1 lacks `b`, row 2 has NaN `a`.
        assert_eq!(t.null_cells(), (8, 2));
    }

    #[test]
    fn columns_put_keys_first() {
        let t = AggregateTable::empty("t", &["movements"]);
        assert_eq!(t.columns(), vec!["date", "entity", "movements"]);
        assert!(t.has_column("date"));
        assert!(!t.has_column("wind_mean"));
        assert!(t.metric_values("wind_mean").is_none());
    }
}
