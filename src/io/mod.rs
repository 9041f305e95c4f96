//! Input/output helpers.
//!
//! - CSV header normalization and value parsing for upstream bodies (`table`)
//! - raw per-day partitions (`partitions`)
//! - daily aggregate snapshots (`snapshot`)
//! - run manifest and content hashes (`manifest`)
//! - structured ingest log (`runlog`)

pub mod manifest;
pub mod partitions;
pub mod runlog;
pub mod snapshot;
pub mod table;

pub use manifest::{Manifest, SourceRecord, content_hash, read_manifest, write_manifest};
pub use snapshot::{read_snapshot, write_snapshot};
