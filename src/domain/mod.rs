//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run inputs (`DateWindow`, `EntityId`, `IngestOptions`, `RunParams`)
//! - raw per-source records (`FlightLeg`, `WeatherObs`, `ThroughputCount`)
//! - canonical daily aggregates (`DailyAggregate`, `AggregateTable`)

pub mod aggregate;
pub mod records;
pub mod types;

pub use aggregate::*;
pub use records::*;
pub use types::*;
