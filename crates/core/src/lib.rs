//! pf exporter core.
//!
//! Turns a point-in-time pf statistics snapshot into a fixed catalog of
//! Prometheus metrics.
//!
//! - [`catalog`]: the 20 metric descriptors, built once per namespace
//! - [`handle`]: the [`PfHandle`] seam and the snapshot fetch adapter
//! - [`emitter`]: snapshot to samples
//! - [`collector`]: the pull collector shared by every scrape
//! - [`exposition`]: samples to metric families and text
//! - [`config`], [`error`], [`metrics`]: configuration, errors, self-metric names

pub mod catalog;
pub mod collector;
pub mod config;
pub mod emitter;
pub mod error;
pub mod exposition;
pub mod handle;
pub mod metrics;
pub mod snapshot;

pub use catalog::{DescriptorCatalog, MetricDescriptor, MetricId, MetricKind};
pub use collector::PfCollector;
pub use config::PfExporterConfig;
pub use emitter::{MetricSample, emit};
pub use error::{
    CatalogError, ConfigError, ExpositionError, FetchError, LabelMismatch, OpenError,
    PfExporterError,
};
pub use handle::{PfHandle, fetch};
pub use snapshot::{
    InterfaceStats, PfStatus, ProtocolCounters, QueueCounters, QueueEntry, StateCounters,
    StatisticsSnapshot,
};
