//! Metric emission.
//!
//! [`emit`] turns one [`StatisticsSnapshot`] into a lazy sequence of
//! [`MetricSample`]s:
//!
//! | Section | Samples | Labels |
//! |---|---|---|
//! | state | always 4 | none |
//! | log interface | 12 when configured, else 0 | none |
//! | queues | 4 per queue | `queue`, `interface` |
//!
//! Counter values are converted from the kernel's `u64` without clamping.

use crate::catalog::{DescriptorCatalog, MetricDescriptor, MetricId};
use crate::error::LabelMismatch;
use crate::snapshot::{ProtocolCounters, QueueEntry, StatisticsSnapshot};

/// Interface metrics in emission order, matching [`protocol_values`].
const IPV4_IDS: [MetricId; 6] = [
    MetricId::Ipv4BytesIn,
    MetricId::Ipv4BytesOut,
    MetricId::Ipv4PacketsInPassed,
    MetricId::Ipv4PacketsInBlocked,
    MetricId::Ipv4PacketsOutPassed,
    MetricId::Ipv4PacketsOutBlocked,
];

const IPV6_IDS: [MetricId; 6] = [
    MetricId::Ipv6BytesIn,
    MetricId::Ipv6BytesOut,
    MetricId::Ipv6PacketsInPassed,
    MetricId::Ipv6PacketsInBlocked,
    MetricId::Ipv6PacketsOutPassed,
    MetricId::Ipv6PacketsOutBlocked,
];

/// One value for one metric, ready for exposition.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    id: MetricId,
    value: f64,
    labels: Vec<String>,
}

impl MetricSample {
    /// Builds a sample, rejecting label values that do not fit the
    /// descriptor's schema.
    pub fn checked(
        descriptor: &MetricDescriptor,
        value: f64,
        labels: Vec<String>,
    ) -> Result<Self, LabelMismatch> {
        if labels.len() != descriptor.labels().len() {
            return Err(LabelMismatch {
                metric: descriptor.name().to_owned(),
                expected: descriptor.labels().len(),
                actual: labels.len(),
            });
        }
        Ok(Self {
            id: descriptor.id(),
            value,
            labels,
        })
    }

    fn emitted(descriptor: &MetricDescriptor, raw: u64, labels: Vec<String>) -> Self {
        debug_assert_eq!(
            labels.len(),
            descriptor.labels().len(),
            "label count mismatch for {}",
            descriptor.name()
        );
        Self {
            id: descriptor.id(),
            value: raw as f64,
            labels,
        }
    }

    pub fn id(&self) -> MetricId {
        self.id
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Label values, in the descriptor's label order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Emits the samples for one snapshot.
///
/// Only called with a successfully fetched snapshot; a failed fetch
/// produces no samples at all.
pub fn emit<'a>(
    snapshot: &'a StatisticsSnapshot,
    catalog: &'a DescriptorCatalog,
) -> impl Iterator<Item = MetricSample> + 'a {
    let state = snapshot.state;
    let state_samples = [
        (MetricId::StateTotal, state.total),
        (MetricId::StateSearches, state.searches),
        (MetricId::StateInserts, state.inserts),
        (MetricId::StateRemovals, state.removals),
    ]
    .into_iter()
    .map(move |(id, raw)| MetricSample::emitted(catalog.get(id), raw, Vec::new()));

    let interface_samples = snapshot.interface().into_iter().flat_map(move |iface| {
        IPV4_IDS
            .into_iter()
            .zip(protocol_values(&iface.ipv4))
            .chain(IPV6_IDS.into_iter().zip(protocol_values(&iface.ipv6)))
            .map(move |(id, raw)| MetricSample::emitted(catalog.get(id), raw, Vec::new()))
    });

    let queue_samples = snapshot
        .queues()
        .iter()
        .flat_map(move |queue| queue_samples(queue, catalog));

    state_samples.chain(interface_samples).chain(queue_samples)
}

fn protocol_values(counters: &ProtocolCounters) -> [u64; 6] {
    [
        counters.bytes_in,
        counters.bytes_out,
        counters.packets_in_passed,
        counters.packets_in_blocked,
        counters.packets_out_passed,
        counters.packets_out_blocked,
    ]
}

fn queue_samples<'a>(
    queue: &'a QueueEntry,
    catalog: &'a DescriptorCatalog,
) -> impl Iterator<Item = MetricSample> + 'a {
    let stats = queue.stats;
    [
        (MetricId::QueueXmitPackets, stats.transmit_packets),
        (MetricId::QueueXmitBytes, stats.transmit_bytes),
        (MetricId::QueueDroppedPackets, stats.dropped_packets),
        (MetricId::QueueDroppedBytes, stats.dropped_bytes),
    ]
    .into_iter()
    .map(move |(id, raw)| {
        let labels = vec![queue.name.clone(), queue.interface.clone()];
        MetricSample::emitted(catalog.get(id), raw, labels)
    })
}
