//! Flight-ops source: a public JSON flight sample.

use std::collections::HashSet;

use serde::Deserialize;

use crate::data::http::HttpClient;
use crate::data::{SourceFetcher, sample};
use crate::domain::{DateWindow, EntityId, FlightLeg, Source};
use crate::error::FetchError;
use crate::io::table::parse_date;

pub const FLIGHT_SAMPLE_URL: &str = "https://raw.githubusercontent.com/vega/vega-datasets/master/data/flights-5k.json";

#[derive(Debug, Clone)]
pub struct FlightOpsFetcher {
    http: HttpClient,
    url: String,
}

impl FlightOpsFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            url: FLIGHT_SAMPLE_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct SampleFlight {
    date: String,
    origin: String,
    destination: String,
}

impl SourceFetcher for FlightOpsFetcher {
    type Record = FlightLeg;

    fn source(&self) -> Source {
        Source::Flights
    }

    fn primary_fetch(&self, window: &DateWindow, entities: &[EntityId]) -> Result<Vec<FlightLeg>, FetchError> {
        let body = self.http.get_text(&self.url, &[], &[])?;
        let legs = parse_flight_sample(&body)?;
        let filtered = filter_legs(legs, window, entities);
        if filtered.is_empty() {
            return Err(FetchError::Empty {
                source_name: Source::Flights.name().to_string(),
            });
        }
        Ok(filtered)
    }

    fn synthetic_fetch(&self, window: &DateWindow, entities: &[EntityId]) -> Vec<FlightLeg> {
        sample::synthetic_flights(entities, window)
    }
}

/// Parse the sample body. The sample carries no cancellation/diversion data,
/// so every leg is flown.
pub fn parse_flight_sample(body: &str) -> Result<Vec<FlightLeg>, FetchError> {
    let rows: Vec<SampleFlight> = serde_json::from_str(body)
        .map_err(|e| FetchError::shape(Source::Flights.name(), format!("invalid flight sample JSON: {e}")))?;

    rows.into_iter()
        .map(|row| {
            let flight_date = parse_date(&row.date).ok_or_else(|| {
                FetchError::shape(Source::Flights.name(), format!("invalid flight date '{}'", row.date))
            })?;
            Ok(FlightLeg {
                flight_date,
                origin: row.origin.trim().to_ascii_uppercase(),
                dest: row.destination.trim().to_ascii_uppercase(),
                cancelled: false,
                diverted: false,
            })
        })
        .collect()
}

/// Keep legs touching any requested entity (short form) within the window.
pub fn filter_legs(legs: Vec<FlightLeg>, window: &DateWindow, entities: &[EntityId]) -> Vec<FlightLeg> {
    let codes: HashSet<&str> = entities.iter().map(EntityId::short_code).collect();
    legs.into_iter()
        .filter(|l| window.contains(l.flight_date))
        .filter(|l| codes.contains(l.origin.as_str()) || codes.contains(l.dest.as_str()))
        .collect()
}
