//! Configuration: `pf-exporter.toml` parsing and runtime settings.
//!
//! [`PfExporterConfig`] holds every section the daemon reads.
//!
//! # Loading precedence
//! 1. CLI flags (highest)
//! 2. Environment variables (`PF_EXPORTER_WEB_LISTEN_ADDRESS=:9107`)
//! 3. Config file (`pf-exporter.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), pf_exporter_core::error::PfExporterError> {
//! use pf_exporter_core::config::PfExporterConfig;
//!
//! // File plus environment overrides
//! let config = PfExporterConfig::load("pf-exporter.toml").await?;
//!
//! // Straight from a TOML string
//! let config = PfExporterConfig::parse("[web]\nlisten_address = \":9107\"")?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::DEFAULT_NAMESPACE;
use crate::error::{ConfigError, PfExporterError};

/// Default scrape listen address: all interfaces, port 9107.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9107";

/// Default scrape path.
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

/// Default pf device node.
pub const DEFAULT_DEVICE: &str = "/dev/pf";

/// Exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PfExporterConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub pf: PfConfig,
    #[serde(default)]
    pub exporter_metrics: ExporterMetricsConfig,
}

impl PfExporterConfig {
    /// Loads a TOML file, applies environment overrides, and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PfExporterError> {
        let config = Self::layered(Some(path.as_ref())).await?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a file.
    pub fn from_env() -> Result<Self, PfExporterError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// The file (or defaults) with environment overrides, not yet validated.
    ///
    /// Callers layer command-line flags on top and validate the result.
    pub async fn layered(path: Option<&Path>) -> Result<Self, PfExporterError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads a TOML file without environment overrides or validation.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PfExporterError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PfExporterError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PfExporterError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string. Missing sections and fields take defaults.
    pub fn parse(toml_str: &str) -> Result<Self, PfExporterError> {
        toml::from_str(toml_str).map_err(|e| {
            PfExporterError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `PF_EXPORTER_{SECTION}_{FIELD}` environment variables.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "PF_EXPORTER_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "PF_EXPORTER_GENERAL_LOG_FORMAT",
        );

        override_string(
            &mut self.web.listen_address,
            "PF_EXPORTER_WEB_LISTEN_ADDRESS",
        );
        override_string(
            &mut self.web.telemetry_path,
            "PF_EXPORTER_WEB_TELEMETRY_PATH",
        );

        override_string(&mut self.pf.device, "PF_EXPORTER_PF_DEVICE");
        override_opt_i32(&mut self.pf.fd, "PF_EXPORTER_PF_FD");
        override_opt_string(&mut self.pf.snapshot_file, "PF_EXPORTER_PF_SNAPSHOT_FILE");
        override_string(&mut self.pf.namespace, "PF_EXPORTER_PF_NAMESPACE");

        override_bool(
            &mut self.exporter_metrics.enabled,
            "PF_EXPORTER_EXPORTER_METRICS_ENABLED",
        );
    }

    /// Checks every value for range and consistency.
    pub fn validate(&self) -> Result<(), PfExporterError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.web.bind_address()?;

        if !self.web.telemetry_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "web.telemetry_path".to_owned(),
                reason: "must start with '/'".to_owned(),
            }
            .into());
        }
        if self.web.telemetry_path == "/" {
            return Err(ConfigError::InvalidValue {
                field: "web.telemetry_path".to_owned(),
                reason: "'/' is reserved for the landing page".to_owned(),
            }
            .into());
        }

        if self.pf.device.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pf.device".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if let Some(fd) = self.pf.fd {
            if fd < 0 {
                return Err(ConfigError::InvalidValue {
                    field: "pf.fd".to_owned(),
                    reason: format!("must be non-negative, got {fd}"),
                }
                .into());
            }
            if self.pf.snapshot_file.is_some() {
                return Err(ConfigError::InvalidValue {
                    field: "pf.fd".to_owned(),
                    reason: "cannot be combined with pf.snapshot_file".to_owned(),
                }
                .into());
            }
        }

        if self.pf.snapshot_file.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue {
                field: "pf.snapshot_file".to_owned(),
                reason: "must not be empty when set".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Scrape endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// `host:port` (host names allowed), or `:port` for all IPv4 interfaces.
    pub listen_address: String,
    pub telemetry_path: String,
}

impl WebConfig {
    /// The listen address in `host:port` form, syntax-checked.
    ///
    /// `:9107` becomes `0.0.0.0:9107`, every IPv4 interface. Use
    /// `[::]:9107` to listen on IPv6.
    pub fn bind_address(&self) -> Result<String, ConfigError> {
        let address = &self.listen_address;
        let normalized = match address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => address.clone(),
        };
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: "web.listen_address".to_owned(),
            reason,
        };
        let (host, port) = normalized
            .rsplit_once(':')
            .ok_or_else(|| invalid(format!("'{address}' is not host:port")))?;
        if host.is_empty() {
            return Err(invalid(format!("'{address}' has an empty host")));
        }
        port.parse::<u16>()
            .map_err(|e| invalid(format!("'{address}' has an invalid port: {e}")))?;
        Ok(normalized)
    }

    /// Resolves the listen address, looking up host names.
    ///
    /// The first resolved address is used.
    pub async fn resolve(&self) -> Result<SocketAddr, ConfigError> {
        let address = self.bind_address()?;
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: "web.listen_address".to_owned(),
            reason,
        };
        tokio::net::lookup_host(address.as_str())
            .await
            .map_err(|e| invalid(format!("cannot resolve '{address}': {e}")))?
            .next()
            .ok_or_else(|| invalid(format!("'{address}' resolved to no addresses")))
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_owned(),
            telemetry_path: DEFAULT_TELEMETRY_PATH.to_owned(),
        }
    }
}

/// Where the pf statistics come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PfConfig {
    /// Device node opened when no `fd` or `snapshot_file` is given.
    pub device: String,
    /// Already-open descriptor for the pf device.
    pub fd: Option<i32>,
    /// JSON snapshot re-read on every scrape instead of the device.
    pub snapshot_file: Option<String>,
    /// Metric name prefix.
    pub namespace: String,
}

impl Default for PfConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_owned(),
            fd: None,
            snapshot_file: None,
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

/// Exporter self-metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterMetricsConfig {
    /// Append the exporter's own metrics to every scrape.
    pub enabled: bool,
}

impl Default for ExporterMetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_opt_i32(target: &mut Option<i32>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<i32>() {
            Ok(parsed) => *target = Some(parsed),
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse i32 from env var, ignoring"
            ),
        }
    }
}
