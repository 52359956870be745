//! Shared tracing setup for the coordinator binary.
//!
//! The coordinator runs as a containerized service, not a desktop app, so logs go to
//! stderr only (no rolling file writer) — the orchestrator is expected to capture and
//! ship stdout/stderr. `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "ligcoord=info";

/// Initialize the global tracing subscriber. Call exactly once, at the top of `main`.
pub fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}
