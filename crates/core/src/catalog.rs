//! Descriptor catalog.
//!
//! [`DescriptorCatalog`] maps every [`MetricId`] to its [`MetricDescriptor`].
//! It is built once at startup and never changes afterwards. Every
//! descriptor is advertised regardless of what the running platform can
//! populate: queue descriptors are described even where no queue samples
//! will ever be emitted.
//!
//! # Naming
//!
//! `<namespace>_<subsystem>_<name>` with subsystem one of `state`, `ipv4`,
//! `ipv6`, `stats`. Counters end in `_total`.

use std::collections::HashMap;
use std::fmt;

use prometheus::core::Desc;

use crate::error::CatalogError;

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "pf";

/// Label key for the queue name.
pub const LABEL_QUEUE: &str = "queue";

/// Label key for the queue's interface.
pub const LABEL_INTERFACE: &str = "interface";

const QUEUE_LABELS: &[&str] = &[LABEL_QUEUE, LABEL_INTERFACE];

/// Kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Instantaneous value.
    Gauge,
    /// Cumulative, non-decreasing value.
    Counter,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gauge => "gauge",
            Self::Counter => "counter",
        }
    }
}

/// Identifier of every metric the exporter can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricId {
    StateTotal,
    StateSearches,
    StateInserts,
    StateRemovals,

    Ipv4BytesIn,
    Ipv4BytesOut,
    Ipv4PacketsInPassed,
    Ipv4PacketsInBlocked,
    Ipv4PacketsOutPassed,
    Ipv4PacketsOutBlocked,

    Ipv6BytesIn,
    Ipv6BytesOut,
    Ipv6PacketsInPassed,
    Ipv6PacketsInBlocked,
    Ipv6PacketsOutPassed,
    Ipv6PacketsOutBlocked,

    QueueXmitPackets,
    QueueXmitBytes,
    QueueDroppedPackets,
    QueueDroppedBytes,
}

impl MetricId {
    /// All identifiers in catalog order.
    pub const ALL: [MetricId; 20] = [
        Self::StateTotal,
        Self::StateSearches,
        Self::StateInserts,
        Self::StateRemovals,
        Self::Ipv4BytesIn,
        Self::Ipv4BytesOut,
        Self::Ipv4PacketsInPassed,
        Self::Ipv4PacketsInBlocked,
        Self::Ipv4PacketsOutPassed,
        Self::Ipv4PacketsOutBlocked,
        Self::Ipv6BytesIn,
        Self::Ipv6BytesOut,
        Self::Ipv6PacketsInPassed,
        Self::Ipv6PacketsInBlocked,
        Self::Ipv6PacketsOutPassed,
        Self::Ipv6PacketsOutBlocked,
        Self::QueueXmitPackets,
        Self::QueueXmitBytes,
        Self::QueueDroppedPackets,
        Self::QueueDroppedBytes,
    ];

    /// Position of this identifier in [`MetricId::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short stable key, e.g. `ipv4_packets_in_blocked`.
    pub fn key(self) -> &'static str {
        self.def().key
    }

    /// Kind of the metric.
    pub fn kind(self) -> MetricKind {
        self.def().kind
    }

    /// Label names, in order.
    pub fn labels(self) -> &'static [&'static str] {
        self.def().labels
    }

    fn def(self) -> &'static MetricDef {
        &DEFS[self.index()]
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Static description of one metric, before namespacing.
struct MetricDef {
    key: &'static str,
    subsystem: &'static str,
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
    labels: &'static [&'static str],
}

const fn gauge(
    key: &'static str,
    subsystem: &'static str,
    name: &'static str,
    help: &'static str,
) -> MetricDef {
    MetricDef {
        key,
        subsystem,
        name,
        help,
        kind: MetricKind::Gauge,
        labels: &[],
    }
}

const fn counter(
    key: &'static str,
    subsystem: &'static str,
    name: &'static str,
    help: &'static str,
) -> MetricDef {
    MetricDef {
        key,
        subsystem,
        name,
        help,
        kind: MetricKind::Counter,
        labels: &[],
    }
}

const fn queue_counter(key: &'static str, name: &'static str, help: &'static str) -> MetricDef {
    MetricDef {
        key,
        subsystem: "stats",
        name,
        help,
        kind: MetricKind::Counter,
        labels: QUEUE_LABELS,
    }
}

// Indexed by `MetricId as usize`; keep in the order of `MetricId::ALL`.
static DEFS: [MetricDef; 20] = [
    gauge("state_total", "state", "total", "Number of pf states."),
    counter(
        "state_searches",
        "state",
        "searches_total",
        "Number of pf state searches.",
    ),
    counter(
        "state_inserts",
        "state",
        "inserts_total",
        "Number of pf state inserts.",
    ),
    counter(
        "state_removals",
        "state",
        "removals_total",
        "Number of pf state removals.",
    ),
    counter(
        "ipv4_bytes_in",
        "ipv4",
        "bytes_in_total",
        "Number of bytes in on the pf loginterface over IPv4.",
    ),
    counter(
        "ipv4_bytes_out",
        "ipv4",
        "bytes_out_total",
        "Number of bytes out on the pf loginterface over IPv4.",
    ),
    counter(
        "ipv4_packets_in_passed",
        "ipv4",
        "packets_in_passed_total",
        "Number of packets passed in on the pf loginterface over IPv4.",
    ),
    counter(
        "ipv4_packets_in_blocked",
        "ipv4",
        "packets_in_blocked_total",
        "Number of packets blocked in on the pf loginterface over IPv4.",
    ),
    counter(
        "ipv4_packets_out_passed",
        "ipv4",
        "packets_out_passed_total",
        "Number of packets passed out on the pf loginterface over IPv4.",
    ),
    counter(
        "ipv4_packets_out_blocked",
        "ipv4",
        "packets_out_blocked_total",
        "Number of packets blocked out on the pf loginterface over IPv4.",
    ),
    counter(
        "ipv6_bytes_in",
        "ipv6",
        "bytes_in_total",
        "Number of bytes in on the pf loginterface over IPv6.",
    ),
    counter(
        "ipv6_bytes_out",
        "ipv6",
        "bytes_out_total",
        "Number of bytes out on the pf loginterface over IPv6.",
    ),
    counter(
        "ipv6_packets_in_passed",
        "ipv6",
        "packets_in_passed_total",
        "Number of packets passed in on the pf loginterface over IPv6.",
    ),
    counter(
        "ipv6_packets_in_blocked",
        "ipv6",
        "packets_in_blocked_total",
        "Number of packets blocked in on the pf loginterface over IPv6.",
    ),
    counter(
        "ipv6_packets_out_passed",
        "ipv6",
        "packets_out_passed_total",
        "Number of packets passed out on the pf loginterface over IPv6.",
    ),
    counter(
        "ipv6_packets_out_blocked",
        "ipv6",
        "packets_out_blocked_total",
        "Number of packets blocked out on the pf loginterface over IPv6.",
    ),
    queue_counter(
        "queue_xmit_packets",
        "queue_transmitted_packets_total",
        "Number of transmitted packets in a queue partitioned by queue name and interface.",
    ),
    queue_counter(
        "queue_xmit_bytes",
        "queue_transmitted_bytes_total",
        "Number of transmitted bytes in a queue partitioned by queue name and interface.",
    ),
    queue_counter(
        "queue_dropped_packets",
        "queue_dropped_packets_total",
        "Number of dropped packets in a queue partitioned by queue name and interface.",
    ),
    queue_counter(
        "queue_dropped_bytes",
        "queue_dropped_bytes_total",
        "Number of dropped bytes in a queue partitioned by queue name and interface.",
    ),
];

/// Static metadata for one metric.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    id: MetricId,
    name: String,
    help: &'static str,
    labels: &'static [&'static str],
    kind: MetricKind,
    desc: Desc,
}

impl MetricDescriptor {
    pub fn id(&self) -> MetricId {
        self.id
    }

    /// Fully-qualified metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        self.help
    }

    /// Label names in emission order.
    pub fn labels(&self) -> &[&'static str] {
        self.labels
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// The prometheus descriptor registered for this metric.
    pub fn desc(&self) -> &Desc {
        &self.desc
    }
}

/// Immutable mapping from [`MetricId`] to [`MetricDescriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorCatalog {
    namespace: String,
    descriptors: Vec<MetricDescriptor>,
}

impl DescriptorCatalog {
    /// Builds the catalog for `namespace`.
    ///
    /// Deterministic and free of I/O; only an invalid namespace fails.
    pub fn build(namespace: &str) -> Result<Self, CatalogError> {
        validate_namespace(namespace)?;

        let descriptors = MetricId::ALL
            .iter()
            .map(|&id| {
                let def = id.def();
                let name = format!("{}_{}_{}", namespace, def.subsystem, def.name);
                let desc = Desc::new(
                    name.clone(),
                    def.help.to_owned(),
                    def.labels.iter().map(|l| (*l).to_owned()).collect(),
                    HashMap::new(),
                )
                .map_err(|source| CatalogError::Descriptor {
                    metric: name.clone(),
                    source,
                })?;
                Ok(MetricDescriptor {
                    id,
                    name,
                    help: def.help,
                    labels: def.labels,
                    kind: def.kind,
                    desc,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        tracing::debug!(
            namespace,
            descriptors = descriptors.len(),
            "descriptor catalog built"
        );

        Ok(Self {
            namespace: namespace.to_owned(),
            descriptors,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// All descriptors, in [`MetricId::ALL`] order.
    pub fn describe(&self) -> impl Iterator<Item = &MetricDescriptor> + '_ {
        self.descriptors.iter()
    }

    /// The descriptor for `id`. Every id is present.
    pub fn get(&self, id: MetricId) -> &MetricDescriptor {
        &self.descriptors[id.index()]
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

fn validate_namespace(namespace: &str) -> Result<(), CatalogError> {
    let invalid = |reason: &str| CatalogError::InvalidNamespace {
        namespace: namespace.to_owned(),
        reason: reason.to_owned(),
    };

    let mut chars = namespace.chars();
    match chars.next() {
        None => return Err(invalid("must not be empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid("must start with a letter or underscore"));
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain letters, digits and underscores"));
    }
    Ok(())
}
