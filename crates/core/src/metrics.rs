//! Exporter self-metrics.
//!
//! Names and descriptions of the metrics the exporter records about its
//! own operation through the `metrics` facade. They are rendered next to
//! the pf metrics on every scrape when a recorder is installed.
//!
//! # Naming
//!
//! - prefix: `pf_exporter_`
//! - suffix: `_total` (counter), `_seconds` (histogram), none (gauge)
//!
//! ```ignore
//! metrics::counter!(pf_exporter_core::metrics::FETCH_ERRORS_TOTAL).increment(1);
//! ```

/// Label key for the build version.
pub const LABEL_VERSION: &str = "version";

/// Completed collection cycles (counter).
pub const SCRAPES_TOTAL: &str = "pf_exporter_scrapes_total";

/// Cycles whose pf status read failed (counter).
pub const FETCH_ERRORS_TOTAL: &str = "pf_exporter_fetch_errors_total";

/// Cycles whose queue read failed while the status read succeeded (counter).
pub const QUEUE_READ_ERRORS_TOTAL: &str = "pf_exporter_queue_read_errors_total";

/// Time spent fetching and emitting one cycle (histogram, seconds).
pub const COLLECT_DURATION_SECONDS: &str = "pf_exporter_collect_duration_seconds";

/// Samples produced by the last successful cycle (gauge).
pub const LAST_SAMPLES: &str = "pf_exporter_last_samples";

/// Build information (gauge, always 1, label: version).
pub const BUILD_INFO: &str = "pf_exporter_build_info";

/// Collection duration histogram buckets (seconds).
///
/// 100us to 1s; a pf status read is a single ioctl.
pub const COLLECT_DURATION_BUCKETS: [f64; 8] =
    [0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 1.0];

/// Registers HELP text for every self-metric.
///
/// Call once after the recorder is installed.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(SCRAPES_TOTAL, "Total number of pf collection cycles");
    describe_counter!(
        FETCH_ERRORS_TOTAL,
        "Total number of collection cycles that failed to read pf statistics"
    );
    describe_counter!(
        QUEUE_READ_ERRORS_TOTAL,
        "Total number of collection cycles that failed to read pf queue statistics"
    );
    describe_histogram!(
        COLLECT_DURATION_SECONDS,
        "Time to fetch and emit one pf snapshot in seconds"
    );
    describe_gauge!(
        LAST_SAMPLES,
        "Number of samples produced by the last successful collection cycle"
    );
    describe_gauge!(
        BUILD_INFO,
        "Build information (always 1, with a version label)"
    );
}
