//! Startup wiring and lifecycle.
//!
//! The [`Orchestrator`] turns a validated configuration into a running
//! exporter:
//!
//! 1. Open the pf handle (device path, inherited fd, or snapshot file)
//! 2. Build the descriptor catalog for the configured namespace
//! 3. Wrap both in the shared [`PfCollector`]
//! 4. Install the self-metrics recorder, if enabled
//! 5. Serve scrapes until SIGTERM or SIGINT
//!
//! A handle that cannot be opened stops startup; a handle that fails to
//! read later only empties individual scrapes.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use pf_exporter_core::config::{PfConfig, PfExporterConfig};
use pf_exporter_core::error::OpenError;
use pf_exporter_core::exposition::{encode_text, to_families};
use pf_exporter_core::handle::PfHandle;
use pf_exporter_core::{DescriptorCatalog, PfCollector};
use pf_exporter_device::{PfDevice, SnapshotFile};

use crate::metrics_server::{self, MetricsServer, ScrapeState};

/// The exporter, assembled and ready to serve.
pub struct Orchestrator {
    config: PfExporterConfig,
    collector: Arc<PfCollector>,
}

impl Orchestrator {
    /// Load configuration from `config_path` and build the exporter.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = PfExporterConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration, opening the pf handle.
    pub fn build_from_config(config: PfExporterConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let handle =
            open_handle(&config.pf).map_err(|e| anyhow::anyhow!("failed to open pf: {}", e))?;
        Self::with_handle(config, handle)
    }

    /// Build around a handle that is already open.
    pub fn with_handle(config: PfExporterConfig, handle: Box<dyn PfHandle>) -> Result<Self> {
        let catalog = DescriptorCatalog::build(&config.pf.namespace)
            .map_err(|e| anyhow::anyhow!("failed to build metric catalog: {}", e))?;
        tracing::info!(
            handle = handle.name(),
            namespace = catalog.namespace(),
            metrics = catalog.len(),
            "pf collector initialized"
        );

        Ok(Self {
            config,
            collector: Arc::new(PfCollector::new(handle, catalog)),
        })
    }

    pub fn config(&self) -> &PfExporterConfig {
        &self.config
    }

    /// Collect once and encode the pf families as text.
    ///
    /// Unlike a scrape, a failed read is returned as an error.
    pub fn collect_once(&self) -> Result<String> {
        let samples = self
            .collector
            .try_collect()
            .map_err(|e| anyhow::anyhow!("failed to get pf stats: {}", e))?;
        let families = to_families(self.collector.catalog(), &samples)?;
        Ok(encode_text(&families)?)
    }

    /// Scrape state for the HTTP server. Installs the global self-metrics
    /// recorder when enabled, so call at most once per process.
    pub fn scrape_state(&self) -> Result<ScrapeState> {
        let self_metrics = if self.config.exporter_metrics.enabled {
            Some(metrics_server::install_self_metrics()?)
        } else {
            None
        };
        ScrapeState::new(
            Arc::clone(&self.collector),
            self.config.web.telemetry_path.clone(),
            self_metrics,
        )
    }

    /// Serve scrapes until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let addr = self.config.web.resolve().await?;
        let server = MetricsServer::bind(addr, self.scrape_state()?).await?;

        server
            .serve(async {
                match wait_for_shutdown_signal().await {
                    Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                    Err(e) => tracing::error!(error = %e, "signal handler failed, shutting down"),
                }
            })
            .await?;

        tracing::info!("pf-exporter shut down");
        Ok(())
    }
}

/// Opens the handle the `[pf]` section selects.
///
/// Precedence: `snapshot_file`, then `fd`, then `device`.
pub fn open_handle(config: &PfConfig) -> Result<Box<dyn PfHandle>, OpenError> {
    if let Some(path) = &config.snapshot_file {
        tracing::info!(path = %path, "reading pf statistics from snapshot file");
        return Ok(Box::new(SnapshotFile::new(path)));
    }
    if let Some(fd) = config.fd {
        return Ok(Box::new(PfDevice::from_raw_fd(fd)?));
    }
    Ok(Box::new(PfDevice::open(&config.device)?))
}

/// Wait for SIGTERM or SIGINT.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
