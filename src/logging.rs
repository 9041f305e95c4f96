//! `tracing` subscriber setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise the crate logs at info (debug with `-v`).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_FILTER: &str = "aero_ingest=info";
pub const VERBOSE_LOG_FILTER: &str = "aero_ingest=debug";

pub fn init(verbose: bool) {
    init_with_default(if verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER });
}

pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Logs go to stderr so report output on stdout stays clean. `try_init`
    // tolerates a subscriber installed earlier in the same process.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
