//! Flight legs -> daily movements per airport.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{AggregateTable, DailyAggregate, EntityId, FlightLeg, Source};

pub const MOVEMENT_COLUMNS: [&str; 3] = ["dep_count", "arr_count", "movements"];

/// Count departures (entity is origin) and arrivals (entity is destination)
/// per day for every entity.
///
/// Legs are matched on the entity's short code. Unless `include_cancelled`
/// is set, cancelled and diverted legs are dropped first. Days with neither a
/// departure nor an arrival produce no row.
pub fn daily_movements(legs: &[FlightLeg], entities: &[EntityId], include_cancelled: bool) -> AggregateTable {
    let mut table = AggregateTable::empty(Source::Flights.daily_dataset(), &MOVEMENT_COLUMNS);

    let unique: BTreeSet<&EntityId> = entities.iter().collect();
    for entity in unique {
        let code = entity.short_code();
        let mut per_day: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();

        let flown = legs
            .iter()
            .filter(|l| include_cancelled || (!l.cancelled && !l.diverted));
        for leg in flown {
            if leg.origin == code {
                per_day.entry(leg.flight_date).or_default().0 += 1;
            }
            if leg.dest == code {
                per_day.entry(leg.flight_date).or_default().1 += 1;
            }
        }

        for (date, (dep, arr)) in per_day {
            table.push(
                DailyAggregate::new(date, entity.clone())
                    .with("dep_count", Some(dep as f64))
                    .with("arr_count", Some(arr as f64))
                    .with("movements", Some((dep + arr) as f64)),
            );
        }
    }

    table.sort();
    table
}
