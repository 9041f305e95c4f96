//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - turns arguments into run parameters and validation thresholds
//! - runs the ingest pipeline (or re-validates persisted snapshots)
//! - prints reports and applies the `--strict` exit policy

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::warn;

use crate::cli::{Command, RunArgs, ThresholdArgs, ValidateArgs, WindowArgs};
use crate::config::Credentials;
use crate::data::{HttpClient, RetryPolicy};
use crate::domain::{DateWindow, EmptyResultPolicy, EntityId, IngestOptions, RunParams, Source};
use crate::error::{AppError, PipelineError};
use crate::io::runlog::{IngestEvent, RunResult, append_event};
use crate::io::snapshot::snapshot_path;
use crate::io::{read_manifest, read_snapshot};
use crate::validate::{CheckResult, Status, Thresholds, ValidationConfig, overall_status, run_all_checks};

pub mod pipeline;

pub const DEFAULT_DAYS_BACK: u32 = 30;

/// Exit code for a run whose checks failed under `--strict`.
pub const EXIT_VALIDATION_FAILED: u8 = 3;

/// Entry point for the `aeroq` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Validate(args) => handle_validate(args),
        Command::Credentials => handle_credentials(),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let params = run_params_from_args(&args, Utc::now().date_naive())?;
    let validation = validation_config_from_args(&args.thresholds)?;
    let deadline = args.deadline_secs.map(|s| Instant::now() + Duration::from_secs(s));

    let retry = RetryPolicy::default().with_deadline(deadline);
    let http = HttpClient::new(retry, Credentials::from_env())
        .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
    let settings = pipeline::PipelineSettings {
        validation,
        deadline,
        out_dir: Some(args.out.clone()),
    };

    let started = Instant::now();
    let result = pipeline::ingest(&params, &pipeline::Fetchers::new(http), &settings);
    log_run(&args.out, &params, started, &result);
    let output = result?;

    println!("{}", crate::report::format_run_header(&params));
    println!("{}", crate::report::format_datasets(&output.datasets, Some(&output.manifest)));
    println!("{}", crate::report::format_checks(&output.checks));
    println!("Output written to {}", args.out.display());

    strict_policy(&output.checks, args.thresholds.strict)
}

fn handle_validate(args: ValidateArgs) -> Result<(), AppError> {
    let validation = validation_config_from_args(&args.thresholds)?;
    let window = match window_from_args(&args.window, Utc::now().date_naive())? {
        Some(window) => window,
        None => {
            read_manifest(&args.out)
                .map_err(|e| {
                    AppError::new(
                        2,
                        format!("No window given and no readable manifest in '{}': {e}", args.out.display()),
                    )
                })?
                .params
                .window
        }
    };

    let mut datasets = BTreeMap::new();
    for source in Source::ALL {
        let name = source.daily_dataset();
        // An absent snapshot is reported by the schema and coverage checks.
        if !snapshot_path(&args.out, name).is_file() {
            warn!(dataset = name, "snapshot not found");
            continue;
        }
        datasets.insert(name.to_string(), read_snapshot(&args.out, name)?);
    }

    let checks = run_all_checks(&datasets, &window, &validation);
    println!("Window: {window}\n");
    println!("{}", crate::report::format_datasets(&datasets, None));
    println!("{}", crate::report::format_checks(&checks));

    strict_policy(&checks, args.thresholds.strict)
}

fn handle_credentials() -> Result<(), AppError> {
    let statuses = Credentials::from_env().status_report();
    print!("{}", crate::report::format_credentials(&statuses));
    Ok(())
}

fn strict_policy(checks: &[CheckResult], strict: bool) -> Result<(), AppError> {
    if strict && overall_status(checks) == Status::Fail {
        let failed = checks.iter().filter(|c| c.status == Status::Fail).count();
        return Err(AppError::new(
            EXIT_VALIDATION_FAILED,
            format!("Validation failed: {failed} check(s) failed."),
        ));
    }
    Ok(())
}

/// Append the run to `<out>/logs/ingest.log`. A log write failure is only warned about.
fn log_run(out: &Path, params: &RunParams, started: Instant, result: &Result<pipeline::IngestOutput, PipelineError>) {
    let (rows, run_result, error) = match result {
        Ok(output) => (output.manifest.rows.clone(), RunResult::Ok, None),
        Err(err) => (BTreeMap::new(), RunResult::Fail, Some(err.to_string())),
    };
    let event = IngestEvent {
        timestamp: Utc::now(),
        entities: params.entities.iter().map(|e| e.to_string()).collect(),
        start: params.window.start(),
        end: params.window.end(),
        rows,
        duration_seconds: started.elapsed().as_secs_f64(),
        result: run_result,
        error,
    };
    if let Err(err) = append_event(out, &event) {
        warn!(%err, "failed to append ingest log");
    }
}

/// Explicit `--start/--end`, else `--days-back`, else `None`.
pub fn window_from_args(args: &WindowArgs, today: NaiveDate) -> Result<Option<DateWindow>, AppError> {
    let window = match (args.start, args.end, args.days_back) {
        (Some(start), Some(end), _) => Some(DateWindow::new(start, end)?),
        (_, _, Some(days)) => Some(DateWindow::days_back(today, days)?),
        _ => None,
    };
    Ok(window)
}

pub fn run_params_from_args(args: &RunArgs, today: NaiveDate) -> Result<RunParams, AppError> {
    let window = match window_from_args(&args.window, today)? {
        Some(window) => window,
        None => DateWindow::days_back(today, DEFAULT_DAYS_BACK)?,
    };

    let mut entities: Vec<EntityId> = Vec::new();
    for code in &args.entities {
        let entity = EntityId::new(code);
        if entity.as_str().is_empty() {
            return Err(AppError::new(2, "Entity codes must not be empty."));
        }
        if !entities.contains(&entity) {
            entities.push(entity);
        }
    }

    Ok(RunParams {
        entities,
        window,
        options: IngestOptions {
            include_cancelled: args.include_cancelled,
            empty_result: if args.keep_empty {
                EmptyResultPolicy::KeepEmpty
            } else {
                EmptyResultPolicy::Synthesize
            },
            offline: args.offline,
        },
    })
}

pub fn validation_config_from_args(args: &ThresholdArgs) -> Result<ValidationConfig, AppError> {
    let defaults = ValidationConfig::default();
    let overlap = Thresholds {
        pass: args.overlap_pass.unwrap_or(defaults.overlap.pass),
        warn: args.overlap_warn.unwrap_or(defaults.overlap.warn),
    };
    if !(0.0..=1.0).contains(&overlap.warn) || !(0.0..=1.0).contains(&overlap.pass) || overlap.warn > overlap.pass {
        return Err(AppError::new(
            2,
            format!(
                "Overlap thresholds must satisfy 0 <= warn <= pass <= 1 (got warn={}, pass={}).",
                overlap.warn, overlap.pass
            ),
        ));
    }
    Ok(ValidationConfig { overlap, ..defaults })
}
