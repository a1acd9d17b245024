//! Log output for the `tally` binary.
//!
//! Logs are always written to stderr so that stdout carries only command
//! results and can be piped.
//!
//! ## Filtering
//!
//! `RUST_LOG` wins when set. Otherwise the `--log-level` / `TALLY_LOG`
//! directive applies (default `info`). Allocation spans and events from the
//! `tally` library are at `debug`, so `TALLY_LOG=tally=debug` shows every
//! cycle.
//!
//! ## Format
//!
//! Human-readable by default. `--log-json` / `TALLY_LOG_JSON=true` switches to
//! one JSON object per line.

use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::config::LogConfig;

pub fn init_telemetry(config: &LogConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid log filter `{}`", config.filter))?,
    };

    let json = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
    });

    let text = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_target(false)
            .with_file(true)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(())
}
