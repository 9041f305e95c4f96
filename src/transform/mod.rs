//! Daily aggregation transforms.
//!
//! Each transform groups raw records by (date, entity) and therefore emits at
//! most one row per key. Empty input yields an empty table that still declares
//! the full column set.

pub mod movements;
pub mod throughput;
pub mod weather;

pub use movements::{MOVEMENT_COLUMNS, daily_movements};
pub use throughput::{NATIONAL_ENTITY, THROUGHPUT_COLUMNS, daily_throughput};
pub use weather::{WEATHER_COLUMNS, daily_weather_features};
