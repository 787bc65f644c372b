//! Error types, one enum per failure domain.
//!
//! | Error | Raised | Handling |
//! |---|---|---|
//! | [`OpenError`] | opening the pf handle at startup | fatal, the daemon exits |
//! | [`FetchError`] | reading a snapshot during a scrape | logged, the scrape yields no samples |
//! | [`LabelMismatch`] | building a sample with the wrong label count | programming defect |
//! | [`CatalogError`] | building the descriptor catalog | fatal at startup |
//! | [`ConfigError`] | loading or validating configuration | fatal at startup |

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum PfExporterError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The pf handle could not be opened.
    #[error("open error: {0}")]
    Open(#[from] OpenError),

    /// A snapshot read failed.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Descriptor catalog construction failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Exposition encoding failed.
    #[error("exposition error: {0}")]
    Exposition(#[from] ExpositionError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A configuration value is out of range.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// The kernel handle could not be obtained.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// The device node does not exist.
    #[error("pf device not found: {path}")]
    NotFound { path: String },

    /// The process may not open the device.
    #[error("permission denied opening {path}")]
    PermissionDenied { path: String },

    /// The pre-opened descriptor is not an open file descriptor.
    #[error("file descriptor {fd} is not open: {source}")]
    InvalidFd {
        fd: i32,
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure while opening.
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A scrape-time snapshot read failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The handle has been closed.
    #[error("pf handle is closed")]
    Closed,

    /// The kernel refused the request.
    #[error("permission denied reading pf statistics")]
    PermissionDenied,

    /// An ioctl request failed.
    #[error("ioctl {request} failed: {source}")]
    Ioctl {
        request: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// No statistics binding exists for this platform.
    #[error("reading pf statistics is not supported on {platform}")]
    Unsupported { platform: &'static str },

    /// The raw statistics could not be decoded.
    #[error("failed to decode pf statistics: {reason}")]
    Decode { reason: String },

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sample label values do not match the descriptor's label schema.
///
/// Never expected in a correct build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("metric '{metric}' expects {expected} label values, got {actual}")]
pub struct LabelMismatch {
    pub metric: String,
    pub expected: usize,
    pub actual: usize,
}

/// Descriptor catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The namespace is not a valid metric name prefix.
    #[error("invalid metric namespace '{namespace}': {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    /// The prometheus descriptor was rejected.
    #[error("invalid descriptor for '{metric}': {source}")]
    Descriptor {
        metric: String,
        #[source]
        source: prometheus::Error,
    },
}

/// Errors while turning samples into exposition output.
#[derive(Debug, thiserror::Error)]
pub enum ExpositionError {
    /// A sample did not match its descriptor.
    #[error(transparent)]
    LabelMismatch(#[from] LabelMismatch),

    /// The prometheus encoder failed.
    #[error("prometheus encoding failed: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// The encoded output was not UTF-8.
    #[error("exposition output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
