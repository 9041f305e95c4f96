//! Weather observations -> daily features per station.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{AggregateTable, DailyAggregate, EntityId, Source, WeatherObs};

pub const WEATHER_COLUMNS: [&str; 7] = [
    "wind_mean",
    "gust_max",
    "vis_min",
    "ceiling_min",
    "precip_any",
    "ts_any",
    "ifr_any",
];

const PRECIP_CODES: [&str; 3] = ["RA", "SN", "DZ"];
const THUNDER_CODE: &str = "TS";
const LOW_CATEGORIES: [&str; 2] = ["IFR", "LIFR"];

#[derive(Default)]
struct DayAcc {
    wind_sum: f64,
    wind_n: usize,
    gust_max: Option<f64>,
    vis_min: Option<f64>,
    ceiling_min: Option<f64>,
    precip: bool,
    thunder: bool,
    low_ifr: bool,
}

impl DayAcc {
    fn add(&mut self, o: &WeatherObs) {
        if let Some(w) = o.wind_speed_kt {
            self.wind_sum += w;
            self.wind_n += 1;
        }
        self.gust_max = fold(self.gust_max, o.wind_gust_kt, f64::max);
        self.vis_min = fold(self.vis_min, o.visibility_statute_mi, f64::min);
        self.ceiling_min = fold(self.ceiling_min, o.ceiling_ft_agl, f64::min);

        let wx = o.wx_string.to_ascii_uppercase();
        self.precip |= PRECIP_CODES.iter().any(|c| wx.contains(c));
        self.thunder |= wx.contains(THUNDER_CODE);
        self.low_ifr |= LOW_CATEGORIES.contains(&o.flight_category.trim().to_ascii_uppercase().as_str());
    }
}

fn fold(acc: Option<f64>, v: Option<f64>, f: fn(f64, f64) -> f64) -> Option<f64> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, v) => v,
        (a, None) => a,
    }
}

fn flag(b: bool) -> Option<f64> {
    Some(if b { 1.0 } else { 0.0 })
}

/// Group observations by (day, station) and summarize.
///
/// Numeric aggregates skip missing values; a day where a field is missing on
/// every observation gets a null cell for it.
pub fn daily_weather_features(obs: &[WeatherObs]) -> AggregateTable {
    let mut groups: BTreeMap<(NaiveDate, EntityId), DayAcc> = BTreeMap::new();
    for o in obs {
        groups
            .entry((o.observation_time.date(), EntityId::new(&o.station_id)))
            .or_default()
            .add(o);
    }

    let mut table = AggregateTable::empty(Source::Weather.daily_dataset(), &WEATHER_COLUMNS);
    for ((date, entity), acc) in groups {
        let wind_mean = (acc.wind_n > 0).then(|| acc.wind_sum / acc.wind_n as f64);
        table.push(
            DailyAggregate::new(date, entity)
                .with("wind_mean", wind_mean)
                .with("gust_max", acc.gust_max)
                .with("vis_min", acc.vis_min)
                .with("ceiling_min", acc.ceiling_min)
                .with("precip_any", flag(acc.precip))
                .with("ts_any", flag(acc.thunder))
                .with("ifr_any", flag(acc.low_ifr)),
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(hour: u32, wind: Option<f64>, gust: Option<f64>, wx: &str, cat: &str) -> WeatherObs {
        WeatherObs {
            station_id: "KATL".to_string(),
            observation_time: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            wind_speed_kt: wind,
            wind_gust_kt: gust,
            visibility_statute_mi: Some(10.0 - hour as f64),
            ceiling_ft_agl: None,
            wx_string: wx.to_string(),
            flight_category: cat.to_string(),
        }
    }

    #[test]
    fn empty_input_keeps_columns() {
        let t = daily_weather_features(&[]);
        assert!(t.is_empty());
        assert_eq!(t.columns().len(), 9);
    }

    #[test]
    fn aggregates_skip_missing_values() {
        let t = daily_weather_features(&[
            obs(1, Some(4.0), None, "", "VFR"),
            obs(2, Some(8.0), Some(20.0), "-RA", "MVFR"),
            obs(3, None, Some(15.0), "", "VFR"),
        ]);
        assert_eq!(t.len(), 1);
        let row = &t.rows()[0];
        assert_eq!(row.metric("wind_mean"), Some(6.0));
        assert_eq!(row.metric("gust_max"), Some(20.0));
        assert_eq!(row.metric("vis_min"), Some(7.0));
        assert_eq!(row.metric("ceiling_min"), None);
        assert_eq!(row.metric("precip_any"), Some(1.0));
        assert_eq!(row.metric("ts_any"), Some(0.0));
        assert_eq!(row.metric("ifr_any"), Some(0.0));
    }

    #[test]
    fn thunderstorm_and_low_category_flags() {
        let t = daily_weather_features(&[obs(1, Some(1.0), None, "tsra", "lifr")]);
        let row = &t.rows()[0];
        assert_eq!(row.metric("ts_any"), Some(1.0));
        assert_eq!(row.metric("precip_any"), Some(1.0));
        assert_eq!(row.metric("ifr_any"), Some(1.0));
    }
}
