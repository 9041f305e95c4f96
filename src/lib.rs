//! `aero-ingest` library crate.
//!
//! The binary (`aeroq`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - other front-ends can call [`app::pipeline::ingest`] directly
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
pub mod transform;
pub mod validate;
