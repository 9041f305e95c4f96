//! Deterministic synthetic data generation.
//!
//! These generators are the fallback path of every fetcher, so they must never
//! fail: they are pure functions of (identifiers, window) and draw from
//! infallible distributions only.
//!
//! Seeding:
//! - flights and weather: one RNG per entity, seeded from a SHA-256 of the code,
//!   so the same entity always produces the same series for the same window
//! - throughput: one fixed seed, so the output depends on the window only

use chrono::{Duration, NaiveTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use sha2::{Digest, Sha256};

use crate::domain::{DateWindow, EntityId, FlightLeg, ThroughputCount, UNKNOWN_AIRPORT, WeatherObs};

/// Fixed seed of the throughput generator.
pub const THROUGHPUT_SEED: u64 = 42;

const DEPARTURES_MEAN: f64 = 350.0;
const ARRIVALS_MEAN: f64 = 340.0;
const MOVEMENTS_SD: f64 = 40.0;
const MOVEMENTS_FLOOR: i64 = 50;

const TRAVELERS_MEAN: f64 = 2_200_000.0;
const TRAVELERS_SD: f64 = 250_000.0;
const TRAVELERS_FLOOR: f64 = 100_000.0;

/// Weighted categories, probabilities summing to 1.
const WX_PHENOMENA: [(&str, f64); 4] = [("", 0.6), ("RA", 0.2), ("TSRA", 0.1), ("BR", 0.1)];
const FLIGHT_CATEGORIES: [(&str, f64); 4] = [("VFR", 0.6), ("MVFR", 0.2), ("IFR", 0.15), ("LIFR", 0.05)];

/// Stable 64-bit seed for an entity code.
pub fn entity_seed(code: &str) -> u64 {
    let digest = Sha256::digest(code.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

fn normal(rng: &mut StdRng, mean: f64, sd: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + sd * z
}

fn categorical<'a>(rng: &mut StdRng, table: &[(&'a str, f64)]) -> &'a str {
    let roll: f64 = rng.r#gen();
    let mut cumulative = 0.0;
    for (value, p) in table {
        cumulative += *p;
        if roll < cumulative {
            return *value;
        }
    }
    table.last().map(|(v, _)| *v).unwrap_or_default()
}

/// Per-day departures and arrivals for each entity.
///
/// Departures are legs from the entity's short code to [`UNKNOWN_AIRPORT`],
/// arrivals the reverse. Each day draws its own cancellation and diversion
/// rates, then flags every leg independently.
pub fn synthetic_flights(entities: &[EntityId], window: &DateWindow) -> Vec<FlightLeg> {
    let mut legs = Vec::new();
    for entity in entities {
        let mut rng = StdRng::seed_from_u64(entity_seed(entity.as_str()));
        let code = entity.short_code().to_string();

        for day in window.dates() {
            let departures = (normal(&mut rng, DEPARTURES_MEAN, MOVEMENTS_SD) as i64).max(MOVEMENTS_FLOOR);
            let arrivals = (normal(&mut rng, ARRIVALS_MEAN, MOVEMENTS_SD) as i64).max(MOVEMENTS_FLOOR);
            let cancel_rate = 0.02 + 0.01 * rng.r#gen::<f64>();
            let divert_rate = 0.005 * rng.r#gen::<f64>();

            let leg = |origin: &str, dest: &str, rng: &mut StdRng| FlightLeg {
                flight_date: day,
                origin: origin.to_string(),
                dest: dest.to_string(),
                cancelled: rng.r#gen::<f64>() < cancel_rate,
                diverted: rng.r#gen::<f64>() < divert_rate,
            };

            for _ in 0..departures {
                legs.push(leg(&code, UNKNOWN_AIRPORT, &mut rng));
            }
            for _ in 0..arrivals {
                legs.push(leg(UNKNOWN_AIRPORT, &code, &mut rng));
            }
        }
    }
    legs
}

/// Hourly observations from the window start through midnight of the day
/// after the window end (inclusive).
pub fn synthetic_weather(station: &EntityId, window: &DateWindow) -> Vec<WeatherObs> {
    let mut rng = StdRng::seed_from_u64(entity_seed(station.as_str()));
    let mut current = window.start().and_time(NaiveTime::MIN);
    let last = (window.end() + Duration::days(1)).and_time(NaiveTime::MIN);

    let mut out = Vec::with_capacity(window.len_days() * 24 + 1);
    while current <= last {
        let wind = normal(&mut rng, 8.0, 4.0).max(0.0);
        let gust = normal(&mut rng, 18.0, 6.0).max(0.0);
        let visibility = normal(&mut rng, 8.0, 2.0).max(0.25);
        let ceiling = normal(&mut rng, 4000.0, 800.0).max(100.0);
        let wx = categorical(&mut rng, &WX_PHENOMENA);
        let category = categorical(&mut rng, &FLIGHT_CATEGORIES);

        out.push(WeatherObs {
            station_id: station.to_string(),
            observation_time: current,
            wind_speed_kt: Some(wind),
            wind_gust_kt: Some(gust),
            visibility_statute_mi: Some(visibility),
            ceiling_ft_agl: Some(ceiling),
            wx_string: wx.to_string(),
            flight_category: category.to_string(),
        });
        current += Duration::hours(1);
    }
    out
}

/// One national total per calendar day of the window.
pub fn synthetic_throughput(window: &DateWindow) -> Vec<ThroughputCount> {
    let mut rng = StdRng::seed_from_u64(THROUGHPUT_SEED);
    window
        .dates()
        .map(|date| {
            let travelers = normal(&mut rng, TRAVELERS_MEAN, TRAVELERS_SD).max(TRAVELERS_FLOOR);
            ThroughputCount {
                date,
                travelers: travelers as u64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn window(start: u32, end: u32) -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, start).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, end).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn entity_seed_is_stable_and_distinct() {
        assert_eq!(entity_seed("KATL"), entity_seed("KATL"));
        assert_ne!(entity_seed("KATL"), entity_seed("KJFK"));
    }

    #[test]
    fn flights_are_deterministic_per_entity() {
        let w = window(1, 3);
        let katl = [EntityId::new("KATL")];
        let a = synthetic_flights(&katl, &w);
        let b = synthetic_flights(&katl, &w);
        assert_eq!(a, b);
        assert_ne!(a, synthetic_flights(&[EntityId::new("KJFK")], &w));

        let days: BTreeSet<_> = a.iter().map(|l| l.flight_date).collect();
        assert_eq!(days.len(), 3);
        for day in days {
            let deps = a.iter().filter(|l| l.flight_date == day && l.origin == "ATL").count();
            let arrs = a.iter().filter(|l| l.flight_date == day && l.dest == "ATL").count();
            assert!(deps >= 50 && arrs >= 50);
        }
    }

    #[test]
    fn weather_is_hourly_through_trailing_midnight() {
        let w = window(1, 2);
        let obs = synthetic_weather(&EntityId::new("KATL"), &w);
        // 2 full days of hours + midnight of the trailing day.
        assert_eq!(obs.len(), 49);
        assert_eq!(obs, synthetic_weather(&EntityId::new("KATL"), &w));
        for o in &obs {
            assert!(o.wind_speed_kt.unwrap() >= 0.0);
            assert!(o.wind_gust_kt.unwrap() >= 0.0);
            assert!(o.visibility_statute_mi.unwrap() >= 0.25);
            assert!(o.ceiling_ft_agl.unwrap() >= 100.0);
            assert!(["", "RA", "TSRA", "BR"].contains(&o.wx_string.as_str()));
            assert!(["VFR", "MVFR", "IFR", "LIFR"].contains(&o.flight_category.as_str()));
        }
    }

    #[test]
    fn throughput_depends_on_window_only() {
        let w = window(1, 10);
        let a = synthetic_throughput(&w);
        assert_eq!(a.len(), 10);
        assert_eq!(a, synthetic_throughput(&w));
        assert!(a.iter().all(|t| t.travelers >= 100_000));
    }
}
