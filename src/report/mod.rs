//! Formatted terminal output: run header, dataset summary, check table,
//! credential status.
//!
//! Formatting lives here so the pipeline stays free of presentation code and
//! output changes stay localized.

use std::collections::BTreeMap;

use crate::config::{CredentialStatus, Severity};
use crate::domain::{AggregateTable, RunParams};
use crate::io::Manifest;
use crate::validate::{CheckResult, Status};

const NAME_WIDTH: usize = 30;
const MESSAGE_WIDTH: usize = 48;

pub fn format_run_header(params: &RunParams) -> String {
    let entities: Vec<&str> = params.entities.iter().map(|e| e.as_str()).collect();
    let mut out = String::new();
    out.push_str(&format!("Window: {} ({} days)\n", params.window, params.window.len_days()));
    out.push_str(&format!("Entities: {}\n", entities.join(", ")));
    out.push_str(&format!(
        "Options: include_cancelled={} offline={}\n",
        params.options.include_cancelled, params.options.offline
    ));
    out
}

/// Row count, last date and (when a manifest is given) provenance per dataset.
pub fn format_datasets(datasets: &BTreeMap<String, AggregateTable>, manifest: Option<&Manifest>) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<18} {:>6} {:<12} {:<14}", "dataset", "rows", "last date", "source").trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<18} {:-<6} {:-<12} {:-<14}", "", "", "", ""));
    out.push('\n');

    for (name, table) in datasets {
        let last = table
            .last_date()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let source = name.strip_suffix("_daily").unwrap_or(name);
        let provenance = manifest
            .and_then(|m| m.sources.get(source))
            .map(|s| s.provenance.as_str())
            .unwrap_or("");
        out.push_str(format!("{name:<18} {:>6} {last:<12} {provenance:<14}", table.len()).trim_end());
        out.push('\n');
    }
    out
}

pub fn format_checks(results: &[CheckResult]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<NAME_WIDTH$} {:<6} {}\n", "check", "status", "message"));
    out.push_str(&format!("{:-<NAME_WIDTH$} {:-<6} {:-<MESSAGE_WIDTH$}\n", "", "", ""));
    for r in results {
        out.push_str(&format!(
            "{:<NAME_WIDTH$} {:<6} {}\n",
            truncate(&r.name, NAME_WIDTH),
            r.status.label(),
            truncate(&r.message, MESSAGE_WIDTH)
        ));
    }

    let count = |s: Status| results.iter().filter(|r| r.status == s).count();
    out.push_str(&format!(
        "\n{} checks: {} pass, {} warn, {} fail\n",
        results.len(),
        count(Status::Pass),
        count(Status::Warn),
        count(Status::Fail)
    ));
    out
}

pub fn format_credentials(statuses: &[CredentialStatus]) -> String {
    let mut out = String::new();
    for s in statuses {
        let marker = match s.severity {
            Severity::Success => "ok",
            Severity::Info => "--",
            Severity::Warn => "!!",
            Severity::Error => "XX",
        };
        out.push_str(&format!("[{marker}] {:<16} {:<15} {}\n", s.name, s.status, s.message));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
