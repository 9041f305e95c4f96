//! Individual data-quality checks.
//!
//! Every check is a pure function over an aggregate (or a column of one) and
//! returns exactly one [`CheckResult`]. A check never fails the caller: a
//! missing column degrades to a `Fail` result.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{AggregateTable, DATE_COLUMN, DateWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub status: Status,
    pub message: String,
    pub observed: Option<Value>,
    pub expected: Option<Value>,
}

impl CheckResult {
    fn new(name: &str, status: Status, message: impl Into<String>, observed: Value, expected: Value) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            observed: Some(observed),
            expected: Some(expected),
        }
    }
}

/// Pass/warn cut-offs for a ratio where higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub pass: f64,
    pub warn: f64,
}

impl Thresholds {
    pub fn classify(&self, ratio: f64) -> Status {
        if ratio >= self.pass {
            Status::Pass
        } else if ratio >= self.warn {
            Status::Warn
        } else {
            Status::Fail
        }
    }
}

/// Inclusive numeric band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBand {
    pub min: f64,
    pub max: f64,
}

impl RangeBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn describe(&self) -> String {
        format!("{}-{}", self.min, self.max)
    }
}

fn percent(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

pub fn schema_check(name: &str, table: &AggregateTable, required: &[&str]) -> CheckResult {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !table.has_column(c))
        .collect();
    let (status, message) = if missing.is_empty() {
        (Status::Pass, "Schema OK".to_string())
    } else {
        (Status::Fail, format!("Missing columns: {}", missing.join(", ")))
    };
    CheckResult::new(name, status, message, json!(table.columns()), json!(required))
}

/// Ratio of null cells over all cells. An empty table has ratio 0.
pub fn null_check(name: &str, table: &AggregateTable, fail_at: f64) -> CheckResult {
    let (total, nulls) = table.null_cells();
    let ratio = nulls as f64 / total.max(1) as f64;
    let status = if nulls == 0 {
        Status::Pass
    } else if ratio < fail_at {
        Status::Warn
    } else {
        Status::Fail
    };
    CheckResult::new(
        name,
        status,
        format!("Null ratio: {}", percent(ratio, 2)),
        json!(ratio),
        json!(format!("<{}", percent(fail_at, 0))),
    )
}

/// Rows whose key tuple was already seen earlier in the table.
pub fn duplicate_check(name: &str, table: &AggregateTable, keys: &[&str]) -> CheckResult {
    let mut seen = HashSet::new();
    let duplicates = table
        .rows()
        .iter()
        .filter(|row| {
            let key: Vec<String> = keys.iter().map(|k| row.cell_text(k)).collect();
            !seen.insert(key)
        })
        .count();
    let (status, message) = if duplicates == 0 {
        (Status::Pass, "No duplicates".to_string())
    } else {
        (Status::Fail, format!("{duplicates} duplicate rows"))
    };
    CheckResult::new(name, status, message, json!(duplicates), json!(0))
}

/// Null values are neither in nor out of band but still count toward the
/// denominator.
pub fn value_range_check(name: &str, values: &[Option<f64>], band: RangeBand, warn_below: f64) -> CheckResult {
    let expected = json!(band.describe());
    if values.is_empty() {
        return CheckResult::new(name, Status::Warn, "Series empty", Value::Null, expected);
    }

    let below = values.iter().flatten().filter(|v| **v < band.min).count();
    let above = values.iter().flatten().filter(|v| **v > band.max).count();
    let out = below + above;
    let status = if out == 0 {
        Status::Pass
    } else if (out as f64) / (values.len() as f64) < warn_below {
        Status::Warn
    } else {
        Status::Fail
    };
    let message = if out == 0 {
        "Within expected range".to_string()
    } else {
        format!("{out} values out of range")
    };
    CheckResult::new(name, status, message, json!({ "below": below, "above": above }), expected)
}

/// Fraction of the window's calendar days present in `dates`.
pub fn coverage_ratio(dates: &BTreeSet<NaiveDate>, window: &DateWindow) -> f64 {
    let expected = window.len_days();
    if expected == 0 {
        return 0.0;
    }
    let observed = window.dates().filter(|d| dates.contains(d)).count();
    observed as f64 / expected as f64
}

pub fn coverage_check(name: &str, table: &AggregateTable, window: &DateWindow, thresholds: Thresholds) -> CheckResult {
    if table.is_empty() || !table.has_column(DATE_COLUMN) {
        return CheckResult::new(name, Status::Fail, "Missing date coverage", json!(0.0), json!(1.0));
    }
    let ratio = coverage_ratio(&table.dates(), window);
    CheckResult::new(
        name,
        thresholds.classify(ratio),
        format!("Coverage: {}", percent(ratio, 1)),
        json!(ratio),
        json!(format!(">={}", percent(thresholds.pass, 0))),
    )
}

/// Fraction of the window on which every table reports data.
pub fn overlap_check(name: &str, tables: &[&AggregateTable], window: &DateWindow, thresholds: Thresholds) -> CheckResult {
    let shared = tables
        .iter()
        .map(|t| t.dates())
        .reduce(|acc, dates| acc.intersection(&dates).copied().collect())
        .unwrap_or_default();
    let ratio = coverage_ratio(&shared, window);
    CheckResult::new(
        name,
        thresholds.classify(ratio),
        format!("Shared coverage: {}", percent(ratio, 1)),
        json!(ratio),
        json!(format!(">={}", percent(thresholds.pass, 0))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyAggregate, EntityId};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn window(start: u32, end: u32) -> DateWindow {
        DateWindow::new(d(start), d(end)).unwrap()
    }

    fn table_on(days: &[u32]) -> AggregateTable {
        let mut t = AggregateTable::empty("t", &["m"]);
        for day in days {
            t.push(DailyAggregate::new(d(*day), EntityId::new("KATL")).with("m", Some(1.0)));
        }
        t
    }

    const COVERAGE: Thresholds = Thresholds { pass: 0.95, warn: 0.75 };
    const OVERLAP: Thresholds = Thresholds { pass: 0.8, warn: 0.5 };

    #[test]
    fn schema_names_missing_columns() {
        let t = AggregateTable::empty("t", &["a"]);
        let r = schema_check("s", &t, &["date", "a", "b", "c"]);
        assert_eq!(r.status, Status::Fail);
        assert_eq!(r.message, "Missing columns: b, c");
        assert_eq!(schema_check("s", &t, &["date", "entity", "a"]).status, Status::Pass);
    }

    #[test]
    fn null_ratio_of_four_percent_warns() {
        // 5 rows x (2 keys + 3 metrics) = 25 cells, one null.
        let mut t = AggregateTable::empty("t", &["a", "b", "c"]);
        for day in 1..=5 {
            let b = if day == 3 { None } else { Some(1.0) };
            t.push(
                DailyAggregate::new(d(day), EntityId::new("KATL"))
                    .with("a", Some(1.0))
                    .with("b", b)
                    .with("c", Some(1.0)),
            );
        }
        let r = null_check("n", &t, 0.05);
        assert_eq!(r.status, Status::Warn);
        assert_eq!(r.observed, Some(json!(0.04)));
        assert_eq!(r.message, "Null ratio: 4.00%");
    }

    #[test]
    fn null_ratio_at_threshold_fails() {
        // 2 rows x 3 cells, one null: 16.7%.
        let mut t = AggregateTable::empty("t", &["a"]);
        t.push(DailyAggregate::new(d(1), EntityId::new("KATL")).with("a", None));
        t.push(DailyAggregate::new(d(2), EntityId::new("KATL")).with("a", Some(1.0)));
        assert_eq!(null_check("n", &t, 0.05).status, Status::Fail);
        assert_eq!(null_check("n", &table_on(&[]), 0.05).status, Status::Pass);
    }

    #[test]
    fn duplicates_count_repeated_keys_only() {
        let mut t = table_on(&[1, 2, 1, 1]);
        assert_eq!(duplicate_check("d", &t, &["date", "entity"]).observed, Some(json!(2)));
        t = table_on(&[1, 2, 3]);
        let r = duplicate_check("d", &t, &["date", "entity"]);
        assert_eq!(r.status, Status::Pass);
        assert_eq!(r.message, "No duplicates");
    }

    #[test]
    fn range_warns_for_small_out_of_band_share() {
        let band = RangeBand::new(0.0, 10.0);
        let mut values: Vec<Option<f64>> = (0..40).map(|_| Some(5.0)).collect();
        values.push(Some(11.0));
        let r = value_range_check("r", &values, band, 0.05);
        assert_eq!(r.status, Status::Warn);
        assert_eq!(r.observed, Some(json!({"below": 0, "above": 1})));

        let r = value_range_check("r", &[Some(-1.0), Some(5.0)], band, 0.05);
        assert_eq!(r.status, Status::Fail);

        let r = value_range_check("r", &[Some(0.0), Some(10.0), None], band, 0.05);
        assert_eq!(r.status, Status::Pass);
    }

    #[test]
    fn empty_table_fails_coverage_with_zero() {
        let r = coverage_check("c", &table_on(&[]), &window(1, 3), COVERAGE);
        assert_eq!(r.status, Status::Fail);
        assert_eq!(r.message, "Missing date coverage");
        assert_eq!(r.observed, Some(json!(0.0)));
    }

    #[test]
    fn coverage_thresholds() {
        let days: Vec<u32> = (1..=20).collect();
        assert_eq!(coverage_check("c", &table_on(&days), &window(1, 20), COVERAGE).status, Status::Pass);
        assert_eq!(coverage_check("c", &table_on(&days[..16]), &window(1, 20), COVERAGE).status, Status::Warn);
        assert_eq!(coverage_check("c", &table_on(&days[..10]), &window(1, 20), COVERAGE).status, Status::Fail);
    }

    #[test]
    fn coverage_never_increases_as_window_widens() {
        let observed = table_on(&[3, 4, 5, 9]).dates();
        let mut last = f64::INFINITY;
        for end in 5..=31 {
            let ratio = coverage_ratio(&observed, &window(3, end));
            assert!(ratio <= last, "coverage rose at end={end}");
            last = ratio;
        }
    }

    #[test]
    fn disjoint_sources_have_zero_overlap() {
        let (a, b, c) = (table_on(&[1]), table_on(&[2]), table_on(&[3]));
        let r = overlap_check("o", &[&a, &b, &c], &window(1, 3), OVERLAP);
        assert_eq!(r.status, Status::Fail);
        assert_eq!(r.observed, Some(json!(0.0)));
    }

    #[test]
    fn overlap_uses_dates_shared_by_all() {
        let a = table_on(&[1, 2, 3, 4]);
        let b = table_on(&[1, 2, 3, 4, 5]);
        let c = table_on(&[2, 3, 4]);
        let r = overlap_check("o", &[&a, &b, &c], &window(1, 5), OVERLAP);
        assert_eq!(r.status, Status::Warn);
        assert_eq!(r.message, "Shared coverage: 60.0%");
    }
}
