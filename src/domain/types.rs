//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - passed between fetchers, transforms and the validation engine
//! - echoed verbatim into the run manifest
//! - rebuilt from persisted snapshots for re-validation

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Prefix letter stripped from 4-character entity codes for sources that use
/// the 3-character form (e.g. `KATL` -> `ATL`).
pub const ENTITY_PREFIX: char = 'K';

/// Inclusive calendar window. Invariant: `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

/// Unchecked wire form of [`DateWindow`].
#[derive(Deserialize)]
struct WindowBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<WindowBounds> for DateWindow {
    type Error = PipelineError;

    fn try_from(b: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(b.start, b.end)
    }
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::InvalidParams(format!(
                "window start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Trailing window of `days` calendar days ending on `today` (inclusive).
    pub fn days_back(today: NaiveDate, days: u32) -> Result<Self, PipelineError> {
        if days == 0 {
            return Err(PipelineError::InvalidParams(
                "days-back must be at least 1".to_string(),
            ));
        }
        let start = today
            .checked_sub_days(Days::new(u64::from(days) - 1))
            .ok_or_else(|| PipelineError::InvalidParams(format!("days-back {days} reaches before the earliest date")))?;
        Self::new(start, today)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days in the window (always >= 1).
    pub fn len_days(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Every date in the window, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A single airport/station identifier tracked across all sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 3-character form used by sources keyed on short codes.
    ///
    /// Only an exact 4-character code starting with [`ENTITY_PREFIX`] is
    /// shortened; everything else passes through unchanged.
    pub fn short_code(&self) -> &str {
        short_code(&self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn short_code(code: &str) -> &str {
    if code.chars().count() == 4 && code.starts_with(ENTITY_PREFIX) {
        &code[ENTITY_PREFIX.len_utf8()..]
    } else {
        code
    }
}

/// The three independent upstream sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Flights,
    Weather,
    Throughput,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Flights, Source::Weather, Source::Throughput];

    pub fn name(self) -> &'static str {
        match self {
            Source::Flights => "flights",
            Source::Weather => "weather",
            Source::Throughput => "throughput",
        }
    }

    /// Name of the daily aggregate dataset produced for this source.
    pub fn daily_dataset(self) -> &'static str {
        match self {
            Source::Flights => "flights_daily",
            Source::Weather => "weather_daily",
            Source::Throughput => "throughput_daily",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Source::Flights => "Flight-ops",
            Source::Weather => "Weather",
            Source::Throughput => "Throughput",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to do when a live source is reachable but has no rows for the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultPolicy {
    /// Treat it like any other failure and use synthetic data.
    #[default]
    Synthesize,
    /// Keep the empty dataset and let validation report it.
    KeepEmpty,
}

/// Caller-controlled switches for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    pub include_cancelled: bool,
    pub empty_result: EmptyResultPolicy,
    /// Skip live sources entirely and use synthetic data.
    pub offline: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            include_cancelled: false,
            empty_result: EmptyResultPolicy::Synthesize,
            offline: false,
        }
    }
}

/// Input parameters of a run, echoed into the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    pub entities: Vec<EntityId>,
    pub window: DateWindow,
    pub options: IngestOptions,
}

impl RunParams {
    /// Copy with repeated entities dropped; first occurrence wins.
    pub fn with_unique_entities(&self) -> Self {
        let mut entities: Vec<EntityId> = Vec::with_capacity(self.entities.len());
        for e in &self.entities {
            if !entities.contains(e) {
                entities.push(e.clone());
            }
        }
        Self {
            entities,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        assert!(DateWindow::new(d(2024, 1, 3), d(2024, 1, 1)).is_err());
        let w = DateWindow::new(d(2024, 1, 1), d(2024, 1, 1)).unwrap();
        assert_eq!(w.len_days(), 1);
    }

    #[test]
    fn window_dates_are_inclusive() {
        let w = DateWindow::new(d(2024, 2, 27), d(2024, 3, 1)).unwrap();
        let dates: Vec<_> = w.dates().collect();
        assert_eq!(dates, vec![d(2024, 2, 27), d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1)]);
        assert_eq!(w.len_days(), 4);
    }

    #[test]
    fn days_back_ends_today() {
        let w = DateWindow::days_back(d(2024, 1, 10), 10).unwrap();
        assert_eq!(w.start(), d(2024, 1, 1));
        assert_eq!(w.end(), d(2024, 1, 10));
        assert!(DateWindow::days_back(d(2024, 1, 10), 0).is_err());
    }

    #[test]
    fn huge_days_back_is_an_error_not_a_panic() {
        let err = DateWindow::days_back(d(2024, 1, 1), u32::MAX).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParams(_)));
    }

    #[test]
    fn deserialized_window_keeps_its_invariant() {
        let w: DateWindow = serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-01-03"}"#).unwrap();
        assert_eq!(w.len_days(), 3);
        assert!(serde_json::from_str::<DateWindow>(r#"{"start":"2024-01-03","end":"2024-01-01"}"#).is_err());
    }

    #[test]
    fn unique_entities_keep_first_occurrence() {
        let params = RunParams {
            entities: ["KORD", "katl", "KORD", "KATL"].iter().map(EntityId::new).collect(),
            window: DateWindow::new(d(2024, 1, 1), d(2024, 1, 1)).unwrap(),
            options: IngestOptions::default(),
        };
        assert_eq!(params.with_unique_entities().entities, vec![EntityId::new("KORD"), EntityId::new("KATL")]);
    }

    #[test]
    fn short_code_strips_prefix_only_for_four_char_codes() {
        assert_eq!(EntityId::new("KATL").short_code(), "ATL");
        assert_eq!(EntityId::new("katl").short_code(), "ATL");
        assert_eq!(EntityId::new("EGLL").short_code(), "EGLL");
        assert_eq!(EntityId::new("KAT").short_code(), "KAT");
        assert_eq!(EntityId::new("ATL").short_code(), "ATL");
        assert_eq!(EntityId::new("KATLX").short_code(), "KATLX");
    }
}
