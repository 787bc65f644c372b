//! Collector facade.
//!
//! [`PfCollector`] owns the pf handle and the descriptor catalog. Each
//! call to [`PfCollector::collect`] performs one full cycle while holding
//! the handle lock:
//!
//! ```text
//! Idle ──lock──▶ Collecting (fetch ─▶ emit) ──unlock──▶ Idle
//! ```
//!
//! Concurrent callers queue on the lock and then run their own fetch;
//! results are never shared or cached between calls.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

use crate::catalog::{DescriptorCatalog, MetricDescriptor};
use crate::emitter::{MetricSample, emit};
use crate::error::{ExpositionError, FetchError};
use crate::exposition;
use crate::handle::{self, PfHandle};
use crate::metrics as m;

/// Pull collector for pf statistics.
pub struct PfCollector {
    handle: Mutex<Box<dyn PfHandle>>,
    handle_name: String,
    catalog: DescriptorCatalog,
}

impl PfCollector {
    pub fn new(handle: Box<dyn PfHandle>, catalog: DescriptorCatalog) -> Self {
        let handle_name = handle.name().to_owned();
        Self {
            handle: Mutex::new(handle),
            handle_name,
            catalog,
        }
    }

    pub fn catalog(&self) -> &DescriptorCatalog {
        &self.catalog
    }

    /// Every descriptor this collector may emit. No I/O, never blocks.
    pub fn describe(&self) -> impl Iterator<Item = &MetricDescriptor> + '_ {
        self.catalog.describe()
    }

    /// Runs one cycle, absorbing a fetch failure.
    ///
    /// A failed fetch is logged and yields no samples.
    pub fn collect(&self) -> Vec<MetricSample> {
        match self.try_collect() {
            Ok(samples) => samples,
            Err(e) => {
                tracing::error!(
                    handle = %self.handle_name,
                    error = %e,
                    "failed to get pf stats"
                );
                metrics::counter!(m::FETCH_ERRORS_TOTAL).increment(1);
                Vec::new()
            }
        }
    }

    /// Runs one cycle, returning a fetch failure to the caller.
    pub fn try_collect(&self) -> Result<Vec<MetricSample>, FetchError> {
        let started = Instant::now();

        // The handle has no invariants a panicking holder could break.
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let result = handle::fetch(&mut **handle)
            .map(|snapshot| emit(&snapshot, &self.catalog).collect::<Vec<_>>());
        drop(handle);

        metrics::counter!(m::SCRAPES_TOTAL).increment(1);
        metrics::histogram!(m::COLLECT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let samples = result?;
        metrics::gauge!(m::LAST_SAMPLES).set(samples.len() as f64);
        tracing::debug!(
            handle = %self.handle_name,
            samples = samples.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "pf collection cycle completed"
        );
        Ok(samples)
    }

    /// Runs one cycle and converts it into metric families.
    pub fn families(&self) -> Result<Vec<MetricFamily>, ExpositionError> {
        exposition::to_families(&self.catalog, &self.collect())
    }
}

impl std::fmt::Debug for PfCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PfCollector")
            .field("handle", &self.handle_name)
            .field("namespace", &self.catalog.namespace())
            .finish()
    }
}

impl Collector for PfCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.catalog.describe().map(MetricDescriptor::desc).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match self.families() {
            Ok(families) => families,
            Err(e) => {
                tracing::error!(error = %e, "failed to build pf metric families");
                Vec::new()
            }
        }
    }
}
