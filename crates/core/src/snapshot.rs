//! Point-in-time pf statistics.
//!
//! A [`StatisticsSnapshot`] is produced by one fetch, consumed by one
//! emission and then dropped. The state section is always present; the
//! interface and queue sections depend on the platform and on pf's
//! configuration.
//!
//! ```text
//! StatisticsSnapshot
//! ├── state       StateCounters            always
//! ├── interface   Option<InterfaceStats>   only with `set loginterface`
//! └── queues      Option<Vec<QueueEntry>>  only where queues are readable
//! ```

use serde::{Deserialize, Serialize};

/// State-table counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCounters {
    /// Current number of states.
    pub total: u64,
    /// State searches since the counters were reset.
    pub searches: u64,
    /// State inserts since the counters were reset.
    pub inserts: u64,
    /// State removals since the counters were reset.
    pub removals: u64,
}

/// Traffic counters for one address family on the log interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolCounters {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in_passed: u64,
    pub packets_in_blocked: u64,
    pub packets_out_passed: u64,
    pub packets_out_blocked: u64,
}

/// Counters of the configured log interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStats {
    /// Interface name; empty means no log interface is configured.
    pub name: String,
    pub ipv4: ProtocolCounters,
    pub ipv6: ProtocolCounters,
}

/// Counters of one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounters {
    pub transmit_packets: u64,
    pub transmit_bytes: u64,
    pub dropped_packets: u64,
    pub dropped_bytes: u64,
}

/// One queue instance and its counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Queue name.
    pub name: String,
    /// Interface the queue is attached to.
    pub interface: String,
    #[serde(default)]
    pub stats: QueueCounters,
}

impl QueueEntry {
    /// The `(queue, interface)` pair identifying this queue.
    pub fn key(&self) -> QueueKey<'_> {
        QueueKey {
            queue: &self.name,
            interface: &self.interface,
        }
    }
}

/// Identifies a queue instance within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueKey<'a> {
    pub queue: &'a str,
    pub interface: &'a str,
}

/// Output of [`PfHandle::stats`](crate::handle::PfHandle::stats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PfStatus {
    pub state: StateCounters,
    #[serde(default)]
    pub interface: Option<InterfaceStats>,
}

/// One point-in-time read of the kernel counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub state: StateCounters,
    #[serde(default)]
    pub interface: Option<InterfaceStats>,
    /// `None` when queues are unsupported or could not be read.
    #[serde(default)]
    pub queues: Option<Vec<QueueEntry>>,
}

impl StatisticsSnapshot {
    /// Builds a snapshot from a status read and an optional queue list.
    pub fn new(status: PfStatus, queues: Option<Vec<QueueEntry>>) -> Self {
        Self {
            state: status.state,
            interface: status.interface,
            queues,
        }
    }

    /// The interface section, if a log interface is configured.
    ///
    /// A present section with an empty name is treated as absent.
    pub fn interface(&self) -> Option<&InterfaceStats> {
        self.interface
            .as_ref()
            .filter(|iface| !iface.name.is_empty())
    }

    /// The queue entries, empty when the section is absent.
    pub fn queues(&self) -> &[QueueEntry] {
        self.queues.as_deref().unwrap_or_default()
    }

    /// Parses a snapshot from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
