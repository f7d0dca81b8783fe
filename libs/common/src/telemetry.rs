//! Tracing initialisation shared by the services

use tracing_subscriber::{EnvFilter, fmt};

/// Default filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global fmt subscriber
///
/// The filter comes from `RUST_LOG` when present, otherwise from `default_filter`.
/// Fails if a global subscriber was already installed.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("setting default subscriber failed: {}", e))
}
