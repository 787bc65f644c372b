//! JSON snapshot files.
//!
//! [`SnapshotFile`] reads a serialized [`StatisticsSnapshot`] on every
//! fetch, so an external process (or a test) can replace the file between
//! scrapes. The status read loads the whole file; the queue read that
//! follows in the same fetch reuses it.

use std::path::{Path, PathBuf};

use pf_exporter_core::error::FetchError;
use pf_exporter_core::handle::PfHandle;
use pf_exporter_core::snapshot::{PfStatus, QueueEntry, StatisticsSnapshot};

/// Handle backed by a JSON snapshot on disk.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    name: String,
    pending_queues: Option<Option<Vec<QueueEntry>>>,
}

impl SnapshotFile {
    /// Creates the handle. The file is not read until the first fetch.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            name,
            pending_queues: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StatisticsSnapshot, FetchError> {
        let content = std::fs::read_to_string(&self.path)?;
        StatisticsSnapshot::from_json(&content).map_err(|e| FetchError::Decode {
            reason: format!("{}: {e}", self.name),
        })
    }
}

impl PfHandle for SnapshotFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&mut self) -> Result<PfStatus, FetchError> {
        self.pending_queues = None;
        let snapshot = self.read()?;
        self.pending_queues = Some(snapshot.queues);
        Ok(PfStatus {
            state: snapshot.state,
            interface: snapshot.interface,
        })
    }

    fn queues(&mut self) -> Result<Option<Vec<QueueEntry>>, FetchError> {
        match self.pending_queues.take() {
            Some(queues) => Ok(queues),
            None => Ok(self.read()?.queues),
        }
    }
}
