//! Source fetchers.
//!
//! Every source offers two strategies behind [`SourceFetcher`]:
//!
//! - `primary_fetch`: the live upstream, through the shared [`http::HttpClient`]
//! - `synthetic_fetch`: a pure, seeded generator from [`sample`]
//!
//! [`SourceFetcher::fetch`] is the single place that chooses between them.

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{DateWindow, EmptyResultPolicy, EntityId, IngestOptions, RawRecord, Source};
use crate::error::FetchError;

pub mod flights;
pub mod http;
pub mod retry;
pub mod sample;
pub mod throughput;
pub mod weather;

pub use flights::FlightOpsFetcher;
pub use http::HttpClient;
pub use retry::RetryPolicy;
pub use throughput::ThroughputFetcher;
pub use weather::WeatherFetcher;

/// Where the records of a dataset came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Provenance {
    Primary,
    /// The live source answered with no rows and the run keeps that result.
    PrimaryEmpty,
    Synthetic { reason: String },
}

impl Provenance {
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Primary => "primary",
            Provenance::PrimaryEmpty => "primary_empty",
            Provenance::Synthetic { .. } => "synthetic",
        }
    }
}

/// Raw records of one source, owned exclusively until handed to a transform.
#[derive(Debug, Clone)]
pub struct Fetched<R> {
    pub source: Source,
    pub records: Vec<R>,
    pub provenance: Provenance,
}

pub trait SourceFetcher: Send + Sync {
    type Record: RawRecord;

    fn source(&self) -> Source;

    /// Fetch from the live upstream. May fail for any reason.
    fn primary_fetch(&self, window: &DateWindow, entities: &[EntityId]) -> Result<Vec<Self::Record>, FetchError>;

    /// Deterministic stand-in data. Must not fail.
    fn synthetic_fetch(&self, window: &DateWindow, entities: &[EntityId]) -> Vec<Self::Record>;

    /// Primary data when usable, synthetic data otherwise. Never fails.
    fn fetch(&self, window: &DateWindow, entities: &[EntityId], options: &IngestOptions) -> Fetched<Self::Record> {
        let source = self.source();
        let outcome = if options.offline {
            Err(None)
        } else {
            match self.primary_fetch(window, entities) {
                Ok(records) if records.is_empty() => Err(Some(FetchError::Empty {
                    source_name: source.name().to_string(),
                })),
                Ok(records) => Ok(records),
                Err(err) => Err(Some(err)),
            }
        };

        match outcome {
            Ok(records) => {
                info!(%source, rows = records.len(), "using primary data");
                Fetched {
                    source,
                    records,
                    provenance: Provenance::Primary,
                }
            }
            Err(err) => match fallback_decision(err.as_ref(), options.empty_result) {
                Fallback::KeepEmpty => {
                    info!(%source, "primary source has no rows for the window; keeping empty result");
                    Fetched {
                        source,
                        records: Vec::new(),
                        provenance: Provenance::PrimaryEmpty,
                    }
                }
                Fallback::Synthesize(reason) => {
                    warn!(%source, %reason, "falling back to synthetic data");
                    Fetched {
                        source,
                        records: self.synthetic_fetch(window, entities),
                        provenance: Provenance::Synthetic { reason },
                    }
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fallback {
    KeepEmpty,
    Synthesize(String),
}

/// `None` means the primary path was skipped (offline run).
fn fallback_decision(err: Option<&FetchError>, policy: EmptyResultPolicy) -> Fallback {
    match err {
        None => Fallback::Synthesize("offline".to_string()),
        Some(e) if e.is_empty_result() && policy == EmptyResultPolicy::KeepEmpty => Fallback::KeepEmpty,
        Some(e) => Fallback::Synthesize(e.to_string()),
    }
}
