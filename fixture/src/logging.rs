//! Diagnostic tracing for fixture setup.
//!
//! Setup steps, collaborator calls and runtime wiring emit `tracing` events.
//! Library code never installs a subscriber; the `fixture` binary does.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for command-line use.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format without targets. Fails if a global
/// subscriber is already installed.
///
/// # Example
/// ```bash
/// RUST_LOG=fixture=debug fixture apply workers.toml
/// ```
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("install tracing subscriber")
}
