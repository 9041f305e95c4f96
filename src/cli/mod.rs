//! Command-line parsing for the aviation ingest pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline code; `app` turns these structs into run parameters.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "aeroq", version, about = "Aviation data ingest with validation")]
pub struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, aggregate, validate and persist a window of data.
    Run(RunArgs),
    /// Re-run the validation battery over persisted snapshots without fetching.
    Validate(ValidateArgs),
    /// Report which credentials are configured.
    Credentials,
}

/// Window selection shared by `run` and `validate`.
#[derive(Debug, Args, Clone)]
pub struct WindowArgs {
    /// First day of the window (YYYY-MM-DD).
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// Last day of the window (YYYY-MM-DD), inclusive.
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Trailing window ending today (UTC); ignored when --start/--end are given.
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub days_back: Option<u32>,
}

/// Pass/fail policy shared by `run` and `validate`.
#[derive(Debug, Args, Clone)]
pub struct ThresholdArgs {
    /// Shared-coverage ratio needed to pass.
    #[arg(long)]
    pub overlap_pass: Option<f64>,

    /// Shared-coverage ratio needed to warn instead of fail.
    #[arg(long)]
    pub overlap_warn: Option<f64>,

    /// Exit with code 3 when any check fails.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Airport/station code; repeat for several.
    #[arg(short, long = "entity", default_value = "KATL")]
    pub entities: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Count cancelled and diverted legs in daily movements.
    #[arg(long)]
    pub include_cancelled: bool,

    /// Output directory for raw partitions, snapshots, manifest and logs.
    #[arg(short, long, default_value = "data")]
    pub out: PathBuf,

    /// Abort the run (writing nothing) after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Keep a reachable source's empty result instead of synthesizing data.
    #[arg(long)]
    pub keep_empty: bool,

    /// Skip live sources and use synthetic data only.
    #[arg(long)]
    pub offline: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ValidateArgs {
    /// Directory a previous `run` wrote to.
    #[arg(short, long, default_value = "data")]
    pub out: PathBuf,

    /// Window to validate; defaults to the window recorded in the manifest.
    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}
