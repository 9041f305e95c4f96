//! Validation engine: a fixed, ordered battery of checks over the daily aggregates.
//!
//! Battery order (stable across runs so reports diff cleanly):
//!
//! 1. schema, per source
//! 2. null ratio, per source
//! 3. duplicates on (date, entity), per non-empty source
//! 4. date coverage, per source
//! 5. value ranges, per banded column present on a non-empty aggregate
//! 6. cross-source date overlap, when all three aggregates are non-empty

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{AggregateTable, DATE_COLUMN, DateWindow, ENTITY_COLUMN, Source};
use crate::transform::{MOVEMENT_COLUMNS, THROUGHPUT_COLUMNS, WEATHER_COLUMNS};

pub mod checks;

pub use checks::{CheckResult, RangeBand, Status, Thresholds};

/// Every threshold and band used by the battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Null ratio at or above this fails.
    pub null_fail_ratio: f64,
    /// Out-of-band share below this warns; at or above it fails.
    pub range_warn_ratio: f64,
    pub coverage: Thresholds,
    pub overlap: Thresholds,
    /// Column -> inclusive band.
    pub ranges: BTreeMap<String, RangeBand>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let ranges = [
            ("movements", RangeBand::new(0.0, 3000.0)),
            ("wind_mean", RangeBand::new(0.0, 150.0)),
            ("gust_max", RangeBand::new(0.0, 200.0)),
            ("vis_min", RangeBand::new(0.0, 15.0)),
            ("ceiling_min", RangeBand::new(0.0, 20000.0)),
            ("travelers", RangeBand::new(1000.0, 4_000_000.0)),
        ]
        .into_iter()
        .map(|(c, b)| (c.to_string(), b))
        .collect();

        Self {
            null_fail_ratio: 0.05,
            range_warn_ratio: 0.05,
            coverage: Thresholds { pass: 0.95, warn: 0.75 },
            overlap: Thresholds { pass: 0.8, warn: 0.5 },
            ranges,
        }
    }
}

/// Range checks in battery order: (source, column, check name).
const RANGE_CHECKS: [(Source, &str, &str); 6] = [
    (Source::Flights, "movements", "Daily movements"),
    (Source::Weather, "wind_mean", "Wind mean"),
    (Source::Weather, "gust_max", "Wind gust"),
    (Source::Weather, "vis_min", "Visibility"),
    (Source::Weather, "ceiling_min", "Ceiling"),
    (Source::Throughput, "travelers", "Throughput travelers"),
];

/// Columns every daily aggregate of `source` must carry.
pub fn required_columns(source: Source) -> Vec<&'static str> {
    let metrics: &[&'static str] = match source {
        Source::Flights => &MOVEMENT_COLUMNS,
        Source::Weather => &WEATHER_COLUMNS,
        Source::Throughput => &THROUGHPUT_COLUMNS,
    };
    let mut cols = vec![DATE_COLUMN, ENTITY_COLUMN];
    cols.extend_from_slice(metrics);
    cols
}

/// Run the full battery.
///
/// `datasets` is keyed by daily dataset name (`flights_daily`, ...). A missing
/// dataset is treated as an empty table without columns, so its schema and
/// coverage checks fail instead of the engine erroring.
pub fn run_all_checks(
    datasets: &BTreeMap<String, AggregateTable>,
    window: &DateWindow,
    config: &ValidationConfig,
) -> Vec<CheckResult> {
    let placeholders: BTreeMap<Source, AggregateTable> = Source::ALL
        .iter()
        .map(|s| (*s, AggregateTable::with_columns(s.daily_dataset(), Vec::new())))
        .collect();
    let table = |s: Source| datasets.get(s.daily_dataset()).unwrap_or(&placeholders[&s]);

    let mut results = Vec::new();

    for s in Source::ALL {
        let name = format!("{} daily schema", s.display_name());
        results.push(checks::schema_check(&name, table(s), &required_columns(s)));
    }
    for s in Source::ALL {
        let name = format!("{} nulls", s.display_name());
        results.push(checks::null_check(&name, table(s), config.null_fail_ratio));
    }
    for s in Source::ALL.into_iter().filter(|s| !table(*s).is_empty()) {
        let name = format!("{} daily duplicates", s.display_name());
        results.push(checks::duplicate_check(&name, table(s), &[DATE_COLUMN, ENTITY_COLUMN]));
    }
    for s in Source::ALL {
        let name = format!("{} coverage", s.display_name());
        results.push(checks::coverage_check(&name, table(s), window, config.coverage));
    }
    for (s, column, name) in RANGE_CHECKS {
        let (Some(values), Some(band)) = (table(s).metric_values(column), config.ranges.get(column)) else {
            debug!(check = name, "column not present; skipping range check");
            continue;
        };
        if values.is_empty() {
            debug!(check = name, "aggregate empty; skipping range check");
            continue;
        }
        results.push(checks::value_range_check(name, &values, *band, config.range_warn_ratio));
    }

    let all: Vec<&AggregateTable> = Source::ALL.iter().map(|s| table(*s)).collect();
    if all.iter().all(|t| !t.is_empty()) {
        results.push(checks::overlap_check("Cross-source date overlap", &all, window, config.overlap));
    }

    for r in &results {
        debug!(check = %r.name, status = %r.status, message = %r.message, "check result");
    }
    info!(
        total = results.len(),
        failed = results.iter().filter(|r| r.status == Status::Fail).count(),
        warned = results.iter().filter(|r| r.status == Status::Warn).count(),
        "validation finished"
    );
    results
}

/// Worst status across results; `Pass` for an empty list.
pub fn overall_status(results: &[CheckResult]) -> Status {
    results.iter().map(|r| r.status).max().unwrap_or(Status::Pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{synthetic_flights, synthetic_throughput, synthetic_weather};
    use crate::domain::{DailyAggregate, EntityId};
    use crate::transform::{daily_movements, daily_throughput, daily_weather_features};
    use chrono::NaiveDate;

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap()
    }

    fn synthetic_datasets() -> BTreeMap<String, AggregateTable> {
        let w = window();
        let katl = EntityId::new("KATL");
        [
            daily_movements(&synthetic_flights(std::slice::from_ref(&katl), &w), &[katl.clone()], false),
            daily_weather_features(&synthetic_weather(&katl, &w)),
            daily_throughput(&synthetic_throughput(&w)),
        ]
        .into_iter()
        .map(|t| (t.name().to_string(), t))
        .collect()
    }

    #[test]
    fn battery_order_is_fixed() {
        let results = run_all_checks(&synthetic_datasets(), &window(), &ValidationConfig::default());
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Flight-ops daily schema",
                "Weather daily schema",
                "Throughput daily schema",
                "Flight-ops nulls",
                "Weather nulls",
                "Throughput nulls",
                "Flight-ops daily duplicates",
                "Weather daily duplicates",
                "Throughput daily duplicates",
                "Flight-ops coverage",
                "Weather coverage",
                "Throughput coverage",
                "Daily movements",
                "Wind mean",
                "Wind gust",
                "Visibility",
                "Ceiling",
                "Throughput travelers",
                "Cross-source date overlap",
            ]
        );
    }

    #[test]
    fn synthetic_run_has_no_structural_failures() {
        let results = run_all_checks(&synthetic_datasets(), &window(), &ValidationConfig::default());
        for r in &results {
            if r.name.contains("schema") || r.name.contains("duplicates") || r.name.contains("coverage") {
                assert_eq!(r.status, Status::Pass, "{}: {}", r.name, r.message);
            }
        }
        assert_eq!(results.last().map(|r| r.status), Some(Status::Pass));
    }

    #[test]
    fn empty_throughput_skips_dependent_checks() {
        let mut datasets = synthetic_datasets();
        datasets.insert(
            "throughput_daily".to_string(),
            AggregateTable::empty("throughput_daily", &THROUGHPUT_COLUMNS),
        );
        let results = run_all_checks(&datasets, &window(), &ValidationConfig::default());

        let coverage = results.iter().find(|r| r.name == "Throughput coverage").unwrap();
        assert_eq!(coverage.status, Status::Fail);
        assert_eq!(coverage.message, "Missing date coverage");
        assert_eq!(coverage.observed, Some(serde_json::json!(0.0)));

        assert!(results.iter().all(|r| r.name != "Throughput daily duplicates"));
        assert!(results.iter().all(|r| r.name != "Throughput travelers"));
        assert!(results.iter().all(|r| r.name != "Cross-source date overlap"));
    }

    #[test]
    fn missing_dataset_degrades_to_fail() {
        let mut datasets = synthetic_datasets();
        datasets.remove("weather_daily");
        let results = run_all_checks(&datasets, &window(), &ValidationConfig::default());
        let schema = results.iter().find(|r| r.name == "Weather daily schema").unwrap();
        assert_eq!(schema.status, Status::Fail);
        assert!(schema.message.starts_with("Missing columns: date, entity, wind_mean"));
        assert_eq!(overall_status(&results), Status::Fail);
    }

    #[test]
    fn overlap_thresholds_are_configurable() {
        let mut datasets = synthetic_datasets();
        let mut flights = AggregateTable::empty("flights_daily", &MOVEMENT_COLUMNS);
        flights.push(
            DailyAggregate::new(window().start(), EntityId::new("KATL"))
                .with("dep_count", Some(1.0))
                .with("arr_count", Some(1.0))
                .with("movements", Some(2.0)),
        );
        datasets.insert("flights_daily".to_string(), flights);

        let strict = run_all_checks(&datasets, &window(), &ValidationConfig::default());
        assert_eq!(strict.last().map(|r| r.status), Some(Status::Fail));

        let lenient = ValidationConfig {
            overlap: Thresholds { pass: 0.3, warn: 0.1 },
            ..ValidationConfig::default()
        };
        let results = run_all_checks(&datasets, &window(), &lenient);
        assert_eq!(results.last().map(|r| r.status), Some(Status::Pass));
    }
}
