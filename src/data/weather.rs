//! Weather source: hourly surface observations (METAR) per station.
//!
//! The upstream answers with CSV preceded by a few status lines; column names
//! vary between releases, so every field is resolved through an alias list.

use crate::data::http::HttpClient;
use crate::data::{SourceFetcher, sample};
use crate::domain::{DateWindow, EntityId, Source, WeatherObs};
use crate::error::FetchError;
use crate::io::table::{CsvTable, cell, parse_datetime, parse_number};

pub const WEATHER_URL: &str = "https://aviationweather.gov/adds/dataserver_current/httpparam";
pub const DEFAULT_USER_AGENT: &str = "aero-ingest/weather";

const TIME_ALIASES: [&str; 2] = ["observation_time", "time"];
const STATION_ALIASES: [&str; 2] = ["station_id", "station"];
const WIND_ALIASES: [&str; 2] = ["wind_speed_kt", "wind_speed"];
const GUST_ALIASES: [&str; 2] = ["wind_gust_kt", "wind_gust"];
const VIS_ALIASES: [&str; 2] = ["visibility_statute_mi", "visibility"];
const WX_ALIASES: [&str; 1] = ["wx_string"];
const CATEGORY_ALIASES: [&str; 1] = ["flight_category"];

#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    http: HttpClient,
    url: String,
    user_agent: String,
}

impl WeatherFetcher {
    pub fn new(http: HttpClient) -> Self {
        let user_agent = http
            .credentials()
            .noaa_user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        Self {
            http,
            url: WEATHER_URL.to_string(),
            user_agent,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn fetch_station(&self, station: &EntityId, window: &DateWindow) -> Result<Vec<WeatherObs>, FetchError> {
        let start = format!("{}T00:00:00Z", window.start());
        let end = format!("{}T23:59:59Z", window.end());
        let params = [
            ("dataSource", "metars"),
            ("requestType", "retrieve"),
            ("format", "csv"),
            ("stationString", station.as_str()),
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
        ];
        let headers = [("user-agent", self.user_agent.as_str())];

        let body = self.http.get_text(&self.url, &params, &headers)?;
        let obs = parse_metar_csv(&body, station)?;
        if obs.is_empty() {
            return Err(FetchError::Empty {
                source_name: format!("{} ({station})", Source::Weather.name()),
            });
        }
        Ok(obs)
    }
}

impl SourceFetcher for WeatherFetcher {
    type Record = WeatherObs;

    fn source(&self) -> Source {
        Source::Weather
    }

    /// Fetches each station in turn; any station failing fails the call.
    ///
    /// The pipeline calls this with one station at a time so that fallback is
    /// decided per station.
    fn primary_fetch(&self, window: &DateWindow, entities: &[EntityId]) -> Result<Vec<WeatherObs>, FetchError> {
        let mut out = Vec::new();
        for station in entities {
            out.extend(self.fetch_station(station, window)?);
        }
        Ok(out)
    }

    fn synthetic_fetch(&self, window: &DateWindow, entities: &[EntityId]) -> Vec<WeatherObs> {
        entities
            .iter()
            .flat_map(|station| sample::synthetic_weather(station, window))
            .collect()
    }
}

/// Parse a METAR CSV body into observations.
///
/// Rows without a parseable observation time are skipped; a body without an
/// observation time column is a shape error. Missing station ids default to
/// the requested station.
pub fn parse_metar_csv(body: &str, station: &EntityId) -> Result<Vec<WeatherObs>, FetchError> {
    let shape = |reason: String| FetchError::shape(Source::Weather.name(), reason);

    let table = CsvTable::parse_from_header(body, |line| {
        let lower = line.to_ascii_lowercase();
        lower.starts_with("raw_text") || lower.contains("observation_time")
    })
    .map_err(|e| shape(format!("invalid CSV: {e}")))?;

    let time_idx = table
        .resolve(&TIME_ALIASES)
        .ok_or_else(|| shape("missing observation_time column".to_string()))?;
    let station_idx = table.resolve(&STATION_ALIASES);
    let wind_idx = table.resolve(&WIND_ALIASES);
    let gust_idx = table.resolve(&GUST_ALIASES);
    let vis_idx = table.resolve(&VIS_ALIASES);
    let wx_idx = table.resolve(&WX_ALIASES);
    let category_idx = table.resolve(&CATEGORY_ALIASES);
    let ceiling_idx = match table.resolve(&["ceiling_ft_agl"]) {
        Some(idx) => vec![idx],
        None => table.columns_containing("ceiling"),
    };

    let number = |rec: &csv::StringRecord, idx: Option<usize>| idx.and_then(|i| cell(rec, i)).and_then(parse_number);
    let text = |rec: &csv::StringRecord, idx: Option<usize>| {
        idx.and_then(|i| cell(rec, i)).unwrap_or_default().to_string()
    };

    let mut out = Vec::new();
    for (_, rec) in table.records() {
        let Some(observation_time) = cell(rec, time_idx).and_then(parse_datetime) else {
            continue;
        };
        let station_id = station_idx
            .and_then(|i| cell(rec, i))
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| station.to_string());
        let ceiling_ft_agl = ceiling_idx
            .iter()
            .filter_map(|i| cell(rec, *i).and_then(parse_number))
            .reduce(f64::min);

        out.push(WeatherObs {
            station_id,
            observation_time,
            wind_speed_kt: number(rec, wind_idx),
            wind_gust_kt: number(rec, gust_idx),
            visibility_statute_mi: number(rec, vis_idx),
            ceiling_ft_agl,
            wx_string: text(rec, wx_idx),
            flight_category: text(rec, category_idx).to_ascii_uppercase(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::data::RetryPolicy;
    use crate::data::http::tests::{ScriptedTransport, ok};
    use chrono::NaiveDate;
    use std::sync::Arc;

    const BODY: &str = "No errors\nNo warnings\n12 ms\ndata source=metars\n2 results\n\
raw_text,station_id,observation_time,wind_speed_kt,wind_gust_kt,visibility_statute_mi,wx_string,flight_category,cloud_base_ceiling_a,ceiling_b\n\
METAR KATL 010552Z,KATL,2024-01-01T05:52:00Z,7,,10.0,RA,VFR,5000,3200\n\
METAR KATL 010652Z,KATL,2024-01-01T06:52:00Z,12,22,2.5,TSRA,ifr,,\n";

    #[test]
    fn parses_preamble_aliases_and_blank_cells() {
        let obs = parse_metar_csv(BODY, &EntityId::new("KATL")).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].wind_speed_kt, Some(7.0));
        assert_eq!(obs[0].wind_gust_kt, None);
        assert_eq!(obs[0].ceiling_ft_agl, Some(3200.0));
        assert_eq!(obs[1].ceiling_ft_agl, None);
        assert_eq!(obs[1].flight_category, "IFR");
        assert_eq!(obs[1].observation_time.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn missing_time_column_is_a_shape_error() {
        let err = parse_metar_csv("station_id,wind_speed_kt\nKATL,5\n", &EntityId::new("KATL")).unwrap_err();
        assert!(matches!(err, FetchError::Shape { .. }));
    }

    #[test]
    fn request_carries_station_window_and_user_agent() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(BODY)]));
        let credentials = Credentials {
            noaa_user_agent: Some("ops@example.com".to_string()),
            ..Credentials::default()
        };
        let http = HttpClient::with_transport(transport.clone(), RetryPolicy::immediate(1), credentials);
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
        .unwrap();

        let obs = WeatherFetcher::new(http)
            .primary_fetch(&window, &[EntityId::new("KATL")])
            .unwrap();
        assert_eq!(obs.len(), 2);

        let seen = transport.seen.lock().unwrap();
        let req = &seen[0];
        assert!(req.query.contains(&("stationString".to_string(), "KATL".to_string())));
        assert!(req.query.contains(&("endTime".to_string(), "2024-01-02T23:59:59Z".to_string())));
        assert_eq!(req.headers.get("user-agent").map(String::as_str), Some("ops@example.com"));
    }
}
