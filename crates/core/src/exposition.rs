//! Registry bridge: samples to prometheus metric families and text.
//!
//! Each cycle builds fresh `CounterVec`/`GaugeVec` values from that
//! cycle's samples, so nothing is carried over between scrapes. Families
//! are produced in catalog order; metrics without samples are omitted.
//! A repeated label set within one metric keeps its first value.

use std::collections::HashSet;

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, TextEncoder};
use tracing::warn;

use crate::catalog::{DescriptorCatalog, MetricDescriptor, MetricId, MetricKind};
use crate::emitter::MetricSample;
use crate::error::{ExpositionError, LabelMismatch};

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Converts one cycle's samples into metric families.
pub fn to_families(
    catalog: &DescriptorCatalog,
    samples: &[MetricSample],
) -> Result<Vec<MetricFamily>, ExpositionError> {
    let mut by_id: Vec<Vec<&MetricSample>> = vec![Vec::new(); MetricId::ALL.len()];
    for sample in samples {
        by_id[sample.id().index()].push(sample);
    }

    let mut families = Vec::new();
    for descriptor in catalog.describe() {
        let group = &by_id[descriptor.id().index()];
        if group.is_empty() {
            continue;
        }
        families.extend(family(descriptor, group)?);
    }
    Ok(families)
}

fn family(
    descriptor: &MetricDescriptor,
    samples: &[&MetricSample],
) -> Result<Vec<MetricFamily>, ExpositionError> {
    let opts = Opts::new(descriptor.name(), descriptor.help());
    let mut seen: HashSet<Vec<&str>> = HashSet::with_capacity(samples.len());
    match descriptor.kind() {
        MetricKind::Counter => {
            let vec = CounterVec::new(opts, descriptor.labels())?;
            for sample in samples {
                let values = label_values(descriptor, sample)?;
                if !first_occurrence(descriptor, &mut seen, &values) {
                    continue;
                }
                vec.get_metric_with_label_values(&values)?
                    .inc_by(sample.value());
            }
            Ok(vec.collect())
        }
        MetricKind::Gauge => {
            let vec = GaugeVec::new(opts, descriptor.labels())?;
            for sample in samples {
                let values = label_values(descriptor, sample)?;
                if !first_occurrence(descriptor, &mut seen, &values) {
                    continue;
                }
                vec.get_metric_with_label_values(&values)?
                    .set(sample.value());
            }
            Ok(vec.collect())
        }
    }
}

fn first_occurrence<'a>(
    descriptor: &MetricDescriptor,
    seen: &mut HashSet<Vec<&'a str>>,
    values: &[&'a str],
) -> bool {
    if seen.insert(values.to_vec()) {
        return true;
    }
    warn!(
        metric = descriptor.name(),
        labels = ?values,
        "duplicate label set in one collection, keeping the first value"
    );
    false
}

fn label_values<'a>(
    descriptor: &MetricDescriptor,
    sample: &'a MetricSample,
) -> Result<Vec<&'a str>, LabelMismatch> {
    if sample.labels().len() != descriptor.labels().len() {
        return Err(LabelMismatch {
            metric: descriptor.name().to_owned(),
            expected: descriptor.labels().len(),
            actual: sample.labels().len(),
        });
    }
    Ok(sample.labels().iter().map(String::as_str).collect())
}

/// Encodes families in the text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, ExpositionError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_NAMESPACE;
    use crate::emitter::emit;
    use crate::snapshot::{
        InterfaceStats, QueueCounters, QueueEntry, StateCounters, StatisticsSnapshot,
    };

    fn catalog() -> DescriptorCatalog {
        DescriptorCatalog::build(DEFAULT_NAMESPACE).unwrap()
    }

    fn snapshot() -> StatisticsSnapshot {
        StatisticsSnapshot {
            state: StateCounters {
                total: 10,
                searches: 100,
                inserts: 50,
                removals: 40,
            },
            interface: None,
            queues: Some(vec![QueueEntry {
                name: "q1".to_owned(),
                interface: "em0".to_owned(),
                stats: QueueCounters {
                    transmit_packets: 5,
                    transmit_bytes: 500,
                    dropped_packets: 1,
                    dropped_bytes: 64,
                },
            }]),
        }
    }

    #[test]
    fn families_follow_catalog_order_and_skip_empty_metrics() {
        let catalog = catalog();
        let samples: Vec<_> = emit(&snapshot(), &catalog).collect();

        let families = to_families(&catalog, &samples).unwrap();

        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert_eq!(
            names,
            vec![
                "pf_state_total",
                "pf_state_searches_total",
                "pf_state_inserts_total",
                "pf_state_removals_total",
                "pf_stats_queue_transmitted_packets_total",
                "pf_stats_queue_transmitted_bytes_total",
                "pf_stats_queue_dropped_packets_total",
                "pf_stats_queue_dropped_bytes_total",
            ]
        );
    }

    #[test]
    fn repeated_queue_keeps_first_value_instead_of_summing() {
        let catalog = catalog();
        let mut snapshot = snapshot();
        let mut second = snapshot.queues.as_ref().unwrap()[0].clone();
        second.stats.transmit_packets = 7;
        snapshot.queues.as_mut().unwrap().push(second);
        let samples: Vec<_> = emit(&snapshot, &catalog).collect();
        assert_eq!(samples.len(), 12);

        let families = to_families(&catalog, &samples).unwrap();
        let text = encode_text(&families).unwrap();

        let tx_lines: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("pf_stats_queue_transmitted_packets_total{"))
            .collect();
        assert_eq!(tx_lines.len(), 1, "{text}");
        assert!(tx_lines[0].ends_with(" 5"), "{}", tx_lines[0]);
        for family in &families {
            assert!(family.get_metric().len() <= 1, "{}", family.get_name());
        }
    }

    #[test]
    fn text_output_has_preamble_and_labeled_lines() {
        let catalog = catalog();
        let samples: Vec<_> = emit(&snapshot(), &catalog).collect();
        let families = to_families(&catalog, &samples).unwrap();

        let text = encode_text(&families).unwrap();

        assert!(text.contains("# HELP pf_state_total Number of pf states.\n"));
        assert!(text.contains("# TYPE pf_state_total gauge\n"));
        assert!(text.contains("pf_state_total 10\n"));
        assert!(text.contains("# TYPE pf_state_searches_total counter\n"));
        assert!(text.contains("pf_state_searches_total 100\n"));
        let queue_line = text
            .lines()
            .find(|l| l.starts_with("pf_stats_queue_dropped_bytes_total{"))
            .unwrap_or_else(|| panic!("no dropped-bytes line in:\n{text}"));
        assert!(queue_line.contains("queue=\"q1\""), "{queue_line}");
        assert!(queue_line.contains("interface=\"em0\""), "{queue_line}");
        assert!(queue_line.ends_with(" 64"), "{queue_line}");
    }

    #[test]
    fn interface_metrics_appear_only_with_a_log_interface() {
        let catalog = catalog();
        let mut snapshot = snapshot();
        snapshot.interface = Some(InterfaceStats {
            name: "em0".to_owned(),
            ..Default::default()
        });
        let samples: Vec<_> = emit(&snapshot, &catalog).collect();

        let text = encode_text(&to_families(&catalog, &samples).unwrap()).unwrap();

        assert!(text.contains("pf_ipv4_bytes_in_total 0\n"));
        assert!(text.contains("pf_ipv6_packets_out_blocked_total 0\n"));
    }

    #[test]
    fn no_samples_encode_to_empty_body() {
        let families = to_families(&catalog(), &[]).unwrap();
        assert!(families.is_empty());
        assert_eq!(encode_text(&families).unwrap(), "");
    }

    #[test]
    fn mismatched_sample_is_rejected() {
        let catalog = catalog();
        let good = MetricSample::checked(
            catalog.get(MetricId::StateTotal),
            1.0,
            Vec::new(),
        )
        .unwrap();
        // A correctly built sample re-targeted at a labeled descriptor.
        let queue_descriptor = catalog.get(MetricId::QueueDroppedBytes);

        let err = label_values(queue_descriptor, &good).unwrap_err();

        assert_eq!(err.expected, 2);
        assert_eq!(err.actual, 0);
    }
}
