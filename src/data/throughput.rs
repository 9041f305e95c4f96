//! Throughput source: national checkpoint traveler counts (static CSV).

use crate::data::http::HttpClient;
use crate::data::{SourceFetcher, sample};
use crate::domain::{DateWindow, EntityId, Source, ThroughputCount};
use crate::error::FetchError;
use crate::io::table::{CsvTable, cell, parse_date, parse_number};

pub const THROUGHPUT_URL: &str = "https://www.tsa.gov/sites/default/files/tsa_travel_numbers.csv";

/// Accepted spellings of the traveler-count column, in priority order.
pub const TRAVELER_ALIASES: [&str; 5] = [
    "travelers",
    "tsa travel numbers",
    "tsa_travelers",
    "throughput",
    "total traveler throughput",
];

#[derive(Debug, Clone)]
pub struct ThroughputFetcher {
    http: HttpClient,
    url: String,
}

impl ThroughputFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            url: THROUGHPUT_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl SourceFetcher for ThroughputFetcher {
    type Record = ThroughputCount;

    fn source(&self) -> Source {
        Source::Throughput
    }

    /// Entities are ignored: throughput is published nationally.
    fn primary_fetch(&self, window: &DateWindow, _entities: &[EntityId]) -> Result<Vec<ThroughputCount>, FetchError> {
        let body = self.http.get_text(&self.url, &[], &[])?;
        let rows: Vec<ThroughputCount> = parse_throughput_csv(&body)?
            .into_iter()
            .filter(|r| window.contains(r.date))
            .collect();
        if rows.is_empty() {
            return Err(FetchError::Empty {
                source_name: Source::Throughput.name().to_string(),
            });
        }
        Ok(rows)
    }

    fn synthetic_fetch(&self, window: &DateWindow, _entities: &[EntityId]) -> Vec<ThroughputCount> {
        sample::synthetic_throughput(window)
    }
}

/// Parse the throughput CSV. Rows with an unparseable date or count are skipped.
pub fn parse_throughput_csv(body: &str) -> Result<Vec<ThroughputCount>, FetchError> {
    let shape = |reason: &str| FetchError::shape(Source::Throughput.name(), reason);

    let table = CsvTable::parse(body).map_err(|e| shape(&format!("invalid CSV: {e}")))?;
    let date_idx = table.resolve(&["date"]).ok_or_else(|| shape("missing date column"))?;
    let count_idx = table
        .resolve(&TRAVELER_ALIASES)
        .ok_or_else(|| shape("missing traveler count column"))?;

    let rows = table
        .records()
        .filter_map(|(_, rec)| {
            let date = cell(rec, date_idx).and_then(parse_date)?;
            let travelers = cell(rec, count_idx).and_then(parse_number)?;
            (travelers >= 0.0).then(|| ThroughputCount {
                date,
                travelers: travelers.round() as u64,
            })
        })
        .collect();
    Ok(rows)
}
