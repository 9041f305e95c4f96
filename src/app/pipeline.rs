//! The ingest pipeline shared by every front-end.
//!
//! fetch (all sources, concurrently) -> transform -> validate -> hash -> persist
//!
//! [`ingest`] is the entry contract: it returns the datasets, the ordered check
//! results and the manifest, and leaves pass/fail policy to the caller.
//! Persistence only happens when an output directory is configured, and only
//! after validation and the deadline check, so a failed run writes nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::info;

use crate::data::{FlightOpsFetcher, Fetched, HttpClient, Provenance, SourceFetcher, ThroughputFetcher, WeatherFetcher};
use crate::domain::{AggregateTable, FlightLeg, RunParams, Source, ThroughputCount, WeatherObs};
use crate::error::PipelineError;
use crate::io::manifest::{Manifest, SourceRecord, write_manifest};
use crate::io::partitions::{NATIONAL_PARTITION, records_for, write_partitions};
use crate::io::snapshot::write_snapshot;
use crate::transform::{daily_movements, daily_throughput, daily_weather_features};
use crate::validate::{CheckResult, ValidationConfig, run_all_checks};

/// The three fetchers of a run, sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct Fetchers {
    pub flights: FlightOpsFetcher,
    pub weather: WeatherFetcher,
    pub throughput: ThroughputFetcher,
}

impl Fetchers {
    pub fn new(http: HttpClient) -> Self {
        Self {
            flights: FlightOpsFetcher::new(http.clone()),
            weather: WeatherFetcher::new(http.clone()),
            throughput: ThroughputFetcher::new(http),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub validation: ValidationConfig,
    /// Overall deadline; checked again before anything is written.
    pub deadline: Option<Instant>,
    /// Root directory for raw partitions, snapshots and the manifest.
    pub out_dir: Option<PathBuf>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    /// Keyed by dataset name (`flights_daily`, `weather_daily`, `throughput_daily`).
    pub datasets: BTreeMap<String, AggregateTable>,
    pub checks: Vec<CheckResult>,
    pub manifest: Manifest,
}

/// Raw records of every source, as fetched.
#[derive(Debug, Clone)]
struct RawBundle {
    flights: Fetched<FlightLeg>,
    /// One entry per requested station.
    weather: Vec<Fetched<WeatherObs>>,
    throughput: Fetched<ThroughputCount>,
}

pub fn ingest(params: &RunParams, fetchers: &Fetchers, settings: &PipelineSettings) -> Result<IngestOutput, PipelineError> {
    ingest_at(params, fetchers, settings, Utc::now())
}

/// [`ingest`] with an explicit manifest timestamp.
pub fn ingest_at(
    params: &RunParams,
    fetchers: &Fetchers,
    settings: &PipelineSettings,
    run_timestamp: DateTime<Utc>,
) -> Result<IngestOutput, PipelineError> {
    if params.entities.is_empty() {
        return Err(PipelineError::InvalidParams("at least one entity is required".to_string()));
    }
    let params = &params.with_unique_entities();
    info!(entities = params.entities.len(), window = %params.window, "starting ingest");

    let raw = fetch_all(params, fetchers);
    let datasets = aggregate(params, &raw);

    // Barrier: validation needs every aggregate.
    let checks = run_all_checks(&datasets, &params.window, &settings.validation);
    let manifest = Manifest::build(params.clone(), datasets.values(), source_records(&raw), run_timestamp);

    if settings.deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(PipelineError::DeadlineExceeded { stage: "persist" });
    }
    if let Some(root) = &settings.out_dir {
        persist(root, params, &raw, &datasets, &manifest)?;
    }

    Ok(IngestOutput {
        datasets,
        checks,
        manifest,
    })
}

/// One task per source, and one per station for weather.
fn fetch_all(params: &RunParams, fetchers: &Fetchers) -> RawBundle {
    let (window, entities, options) = (&params.window, params.entities.as_slice(), &params.options);

    let ((flights, weather), throughput) = rayon::join(
        || {
            rayon::join(
                || fetchers.flights.fetch(window, entities, options),
                || {
                    entities
                        .par_iter()
                        .map(|station| fetchers.weather.fetch(window, std::slice::from_ref(station), options))
                        .collect::<Vec<_>>()
                },
            )
        },
        || fetchers.throughput.fetch(window, entities, options),
    );

    RawBundle {
        flights,
        weather,
        throughput,
    }
}

fn aggregate(params: &RunParams, raw: &RawBundle) -> BTreeMap<String, AggregateTable> {
    let observations: Vec<WeatherObs> = raw
        .weather
        .iter()
        .flat_map(|f| f.records.iter().cloned())
        .collect();

    let tables = [
        daily_movements(&raw.flights.records, &params.entities, params.options.include_cancelled),
        daily_weather_features(&observations),
        daily_throughput(&raw.throughput.records),
    ];
    tables
        .into_iter()
        .inspect(|t| info!(dataset = t.name(), rows = t.len(), "aggregated"))
        .map(|t| (t.name().to_string(), t))
        .collect()
}

fn source_record(provenance: &Provenance) -> SourceRecord {
    SourceRecord {
        provenance: provenance.label().to_string(),
        reason: match provenance {
            Provenance::Synthetic { reason } => Some(reason.clone()),
            _ => None,
        },
    }
}

/// Weather is summarized over its stations: any synthetic station makes the
/// source synthetic, otherwise it is empty only if every station was.
fn source_records(raw: &RawBundle) -> BTreeMap<String, SourceRecord> {
    let synthetic: Vec<String> = raw
        .weather
        .iter()
        .filter_map(|f| match &f.provenance {
            Provenance::Synthetic { reason } => Some(reason.clone()),
            _ => None,
        })
        .collect();
    let weather = if !synthetic.is_empty() {
        Provenance::Synthetic {
            reason: synthetic.join("; "),
        }
    } else if !raw.weather.is_empty() && raw.weather.iter().all(|f| f.provenance == Provenance::PrimaryEmpty) {
        Provenance::PrimaryEmpty
    } else {
        Provenance::Primary
    };

    BTreeMap::from([
        (Source::Flights.name().to_string(), source_record(&raw.flights.provenance)),
        (Source::Weather.name().to_string(), source_record(&weather)),
        (Source::Throughput.name().to_string(), source_record(&raw.throughput.provenance)),
    ])
}

/// Raw partitions, then snapshots, then the manifest last.
fn persist(
    root: &Path,
    params: &RunParams,
    raw: &RawBundle,
    datasets: &BTreeMap<String, AggregateTable>,
    manifest: &Manifest,
) -> Result<(), PipelineError> {
    let mut files = 0;
    for entity in &params.entities {
        let (full, short) = (entity.as_str(), entity.short_code());
        files += write_partitions(root, Source::Flights, short, records_for(&raw.flights.records, full, short))?.len();
        for fetched in &raw.weather {
            files += write_partitions(root, Source::Weather, full, records_for(&fetched.records, full, short))?.len();
        }
    }
    files += write_partitions(root, Source::Throughput, NATIONAL_PARTITION, &raw.throughput.records)?.len();
    info!(files, root = %root.display(), "wrote raw partitions");

    for table in datasets.values() {
        write_snapshot(root, table)?;
    }
    write_manifest(root, manifest)?;
    Ok(())
}
