//! Kernel handle abstraction and the fetch adapter.
//!
//! [`PfHandle`] is the seam to the platform: each implementation reads
//! pf's status and, where supported, its queues. [`fetch`] assembles one
//! [`StatisticsSnapshot`] from those reads.
//!
//! A failed status read fails the whole fetch. A failed queue read only
//! drops the queue section, since state and interface counters are still
//! valid.

use crate::error::FetchError;
use crate::metrics as m;
use crate::snapshot::{PfStatus, QueueEntry, StatisticsSnapshot};

/// Access to the kernel firewall's statistics.
///
/// Implementations are not required to be safe for concurrent use; callers
/// hold exclusive access for the duration of a fetch.
pub trait PfHandle: Send {
    /// Handle name used in logs (e.g. `/dev/pf`).
    fn name(&self) -> &str;

    /// Reads state-table and log-interface counters.
    fn stats(&mut self) -> Result<PfStatus, FetchError>;

    /// Reads the queue list.
    ///
    /// `Ok(None)` means the platform has no queue support.
    fn queues(&mut self) -> Result<Option<Vec<QueueEntry>>, FetchError> {
        Ok(None)
    }
}

impl<H: PfHandle + ?Sized> PfHandle for Box<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn stats(&mut self) -> Result<PfStatus, FetchError> {
        (**self).stats()
    }

    fn queues(&mut self) -> Result<Option<Vec<QueueEntry>>, FetchError> {
        (**self).queues()
    }
}

/// Reads one snapshot through `handle`.
pub fn fetch(handle: &mut dyn PfHandle) -> Result<StatisticsSnapshot, FetchError> {
    let status = handle.stats()?;

    let queues = match handle.queues() {
        Ok(queues) => queues,
        Err(e) => {
            tracing::warn!(
                handle = handle.name(),
                error = %e,
                "failed to read pf queue stats, omitting queue metrics"
            );
            metrics::counter!(m::QUEUE_READ_ERRORS_TOTAL).increment(1);
            None
        }
    };

    tracing::trace!(
        handle = handle.name(),
        interface = status.interface.as_ref().map(|i| i.name.as_str()),
        queues = queues.as_ref().map(Vec::len),
        "pf snapshot fetched"
    );

    Ok(StatisticsSnapshot::new(status, queues))
}
