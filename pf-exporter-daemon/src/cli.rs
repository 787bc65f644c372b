//! CLI argument definitions for pf-exporter.
//!
//! Uses `clap` v4 derive macros. Flag names follow the dotted
//! `--web.*` / `--pf.*` convention of other Prometheus exporters.

use std::path::PathBuf;

use clap::Parser;

use pf_exporter_core::config::PfExporterConfig;

/// Prometheus exporter for pf packet filter statistics.
#[derive(Parser, Debug)]
#[command(name = "pf-exporter")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to a pf-exporter.toml configuration file.
    ///
    /// Without it, defaults and environment variables are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on for the web interface and telemetry.
    #[arg(long = "web.listen-address", value_name = "ADDRESS")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", value_name = "PATH")]
    pub telemetry_path: Option<String>,

    /// Use this already-open descriptor for pf ioctls.
    #[arg(long = "pf.fd", value_name = "FD")]
    pub fd: Option<i32>,

    /// pf device node to open.
    #[arg(long = "pf.device", value_name = "PATH")]
    pub device: Option<String>,

    /// Read statistics from this JSON snapshot instead of the device.
    #[arg(long = "pf.snapshot-file", value_name = "PATH", conflicts_with = "fd")]
    pub snapshot_file: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    pub validate: bool,

    /// Collect once, print the exposition to stdout, and exit.
    #[arg(long)]
    pub once: bool,
}

impl DaemonCli {
    /// File, environment and flags merged in that order, then validated.
    pub async fn resolve_config(&self) -> anyhow::Result<PfExporterConfig> {
        let mut config = PfExporterConfig::layered(self.config.as_deref())
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        self.apply_overrides(&mut config);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(config)
    }

    /// Applies every flag that was given on top of `config`.
    pub fn apply_overrides(&self, config: &mut PfExporterConfig) {
        if let Some(v) = &self.listen_address {
            config.web.listen_address = v.clone();
        }
        if let Some(v) = &self.telemetry_path {
            config.web.telemetry_path = v.clone();
        }
        if let Some(fd) = self.fd {
            config.pf.fd = Some(fd);
            config.pf.snapshot_file = None;
        }
        if let Some(v) = &self.device {
            config.pf.device = v.clone();
        }
        if let Some(v) = &self.snapshot_file {
            config.pf.snapshot_file = Some(v.clone());
            config.pf.fd = None;
        }
        if let Some(v) = &self.log_level {
            config.general.log_level = v.clone();
        }
        if let Some(v) = &self.log_format {
            config.general.log_format = v.clone();
        }
    }
}
