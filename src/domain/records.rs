//! Raw, source-specific observations.
//!
//! Records are immutable once fetched. They serialize straight into the raw
//! per-day CSV partitions, so field names double as partition column names.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Placeholder code used for the far end of synthetic flight legs.
pub const UNKNOWN_AIRPORT: &str = "ZZZ";

/// Behaviour shared by every raw record type.
pub trait RawRecord: Serialize + Clone + Send + Sync {
    /// Calendar day the record belongs to (partition key).
    fn date(&self) -> NaiveDate;

    /// Whether this record belongs to the partition of `code`.
    ///
    /// `code` is compared against both the full and the short entity form.
    fn belongs_to(&self, full: &str, short: &str) -> bool;
}

/// One flight leg (departure or arrival) as published by a flight-ops source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightLeg {
    pub flight_date: NaiveDate,
    pub origin: String,
    pub dest: String,
    pub cancelled: bool,
    pub diverted: bool,
}

impl RawRecord for FlightLeg {
    fn date(&self) -> NaiveDate {
        self.flight_date
    }

    fn belongs_to(&self, full: &str, short: &str) -> bool {
        [full, short]
            .iter()
            .any(|c| self.origin.eq_ignore_ascii_case(c) || self.dest.eq_ignore_ascii_case(c))
    }
}

/// One surface weather observation.
///
/// Numeric fields are optional: live reports routinely omit gusts or ceilings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObs {
    pub station_id: String,
    pub observation_time: NaiveDateTime,
    pub wind_speed_kt: Option<f64>,
    pub wind_gust_kt: Option<f64>,
    pub visibility_statute_mi: Option<f64>,
    pub ceiling_ft_agl: Option<f64>,
    /// Present-weather phenomenon code (`""`, `RA`, `TSRA`, `BR`, ...).
    pub wx_string: String,
    /// `VFR`, `MVFR`, `IFR`, `LIFR` (or empty when unreported).
    pub flight_category: String,
}

impl RawRecord for WeatherObs {
    fn date(&self) -> NaiveDate {
        self.observation_time.date()
    }

    fn belongs_to(&self, full: &str, short: &str) -> bool {
        self.station_id.eq_ignore_ascii_case(full) || self.station_id.eq_ignore_ascii_case(short)
    }
}

/// National checkpoint throughput for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputCount {
    pub date: NaiveDate,
    pub travelers: u64,
}

impl RawRecord for ThroughputCount {
    fn date(&self) -> NaiveDate {
        self.date
    }

    /// Throughput is national: every entity shares the same partition.
    fn belongs_to(&self, _full: &str, _short: &str) -> bool {
        true
    }
}
