//! Throughput counts -> one national row per day.

use std::collections::BTreeMap;

use crate::domain::{AggregateTable, DailyAggregate, EntityId, Source, ThroughputCount};

pub const THROUGHPUT_COLUMNS: [&str; 1] = ["travelers"];

/// Entity code carried by national throughput rows.
pub const NATIONAL_ENTITY: &str = "US";

/// A date reported more than once keeps its last count.
pub fn daily_throughput(counts: &[ThroughputCount]) -> AggregateTable {
    let per_day: BTreeMap<_, _> = counts.iter().map(|c| (c.date, c.travelers)).collect();

    let mut table = AggregateTable::empty(Source::Throughput.daily_dataset(), &THROUGHPUT_COLUMNS);
    let entity = EntityId::new(NATIONAL_ENTITY);
    for (date, travelers) in per_day {
        table.push(DailyAggregate::new(date, entity.clone()).with("travelers", Some(travelers as f64)));
    }
    table
}
