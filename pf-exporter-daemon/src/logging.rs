//! Logging initialization for pf-exporter.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `PfExporterConfig`: JSON lines for production, pretty output for
//! development. `RUST_LOG`, when set, replaces the configured level.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use pf_exporter_core::config::GeneralConfig;

/// Directives appended to the configured level.
///
/// hyper logs every connection at debug.
const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn";

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before the first scrape.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter = build_filter(config)?;

    match config.log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)),
        other => Err(anyhow::anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        )),
    }
}

fn build_filter(config: &GeneralConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(format!("{},{}", config.log_level, QUIET_DEPENDENCIES))
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", config.log_level, e))
}
