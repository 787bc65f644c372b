//! End-to-end collection scenarios: handle -> fetch -> emit -> exposition.

use std::sync::{Arc, Mutex};

use pf_exporter_core::catalog::DEFAULT_NAMESPACE;
use pf_exporter_core::exposition::{encode_text, to_families};
use pf_exporter_core::{
    DescriptorCatalog, FetchError, InterfaceStats, MetricId, PfCollector, PfHandle, PfStatus,
    QueueEntry, StateCounters, StatisticsSnapshot,
};

/// Handle replaying a fixed snapshot, with switchable failures.
struct FixtureHandle {
    snapshot: StatisticsSnapshot,
    fail_stats: Arc<Mutex<bool>>,
    fail_queues: bool,
}

impl FixtureHandle {
    fn new(snapshot: StatisticsSnapshot) -> Self {
        Self {
            snapshot,
            fail_stats: Arc::new(Mutex::new(false)),
            fail_queues: false,
        }
    }
}

impl PfHandle for FixtureHandle {
    fn name(&self) -> &str {
        "fixture"
    }

    fn stats(&mut self) -> Result<PfStatus, FetchError> {
        if *self.fail_stats.lock().unwrap() {
            return Err(FetchError::PermissionDenied);
        }
        Ok(PfStatus {
            state: self.snapshot.state,
            interface: self.snapshot.interface.clone(),
        })
    }

    fn queues(&mut self) -> Result<Option<Vec<QueueEntry>>, FetchError> {
        if self.fail_queues {
            return Err(FetchError::Decode {
                reason: "truncated queue record".to_owned(),
            });
        }
        Ok(self.snapshot.queues.clone())
    }
}

fn catalog() -> DescriptorCatalog {
    DescriptorCatalog::build(DEFAULT_NAMESPACE).unwrap()
}

fn scenario_b() -> StatisticsSnapshot {
    StatisticsSnapshot::from_json(include_str!("fixtures/snapshot.json")).unwrap()
}

#[test]
fn state_only_snapshot_yields_four_unlabeled_samples() {
    // Given: state counters, an unnamed log interface and no queues
    let snapshot = StatisticsSnapshot {
        state: StateCounters {
            total: 10,
            searches: 100,
            inserts: 50,
            removals: 40,
        },
        interface: Some(InterfaceStats::default()),
        queues: None,
    };
    let collector = PfCollector::new(Box::new(FixtureHandle::new(snapshot)), catalog());

    // When: collecting once
    let samples = collector.collect();

    // Then: only the four state samples, in catalog order
    let ids: Vec<MetricId> = samples.iter().map(|s| s.id()).collect();
    assert_eq!(
        ids,
        vec![
            MetricId::StateTotal,
            MetricId::StateSearches,
            MetricId::StateInserts,
            MetricId::StateRemovals,
        ]
    );
    let values: Vec<f64> = samples.iter().map(|s| s.value()).collect();
    assert_eq!(values, vec![10.0, 100.0, 50.0, 40.0]);
    assert!(samples.iter().all(|s| s.labels().is_empty()));
}

#[test]
fn interface_and_queue_snapshot_yields_twenty_samples() {
    // Given: zero state counters, log interface em0 and one queue
    let collector = PfCollector::new(Box::new(FixtureHandle::new(scenario_b())), catalog());

    // When: collecting once
    let samples = collector.collect();

    // Then: 4 state + 12 interface + 4 queue samples
    assert_eq!(samples.len(), 20);
    let labeled: Vec<_> = samples.iter().filter(|s| !s.labels().is_empty()).collect();
    assert_eq!(labeled.len(), 4);
    for sample in &labeled {
        assert_eq!(sample.labels(), ["q1", "em0"]);
    }
    let queue_values: Vec<f64> = labeled.iter().map(|s| s.value()).collect();
    assert_eq!(queue_values, vec![5.0, 500.0, 1.0, 64.0]);
}

#[test]
fn queue_read_failure_keeps_state_and_interface_samples() {
    // Given: a handle whose queue read fails
    let mut handle = FixtureHandle::new(scenario_b());
    handle.fail_queues = true;
    let collector = PfCollector::new(Box::new(handle), catalog());

    // When: collecting once
    let samples = collector.collect();

    // Then: the queue section is dropped, everything else survives
    assert_eq!(samples.len(), 16);
    assert!(samples.iter().all(|s| s.labels().is_empty()));
}

#[test]
fn recovered_handle_produces_samples_again() {
    // Given: a handle that fails its first read
    let handle = FixtureHandle::new(scenario_b());
    let fail = Arc::clone(&handle.fail_stats);
    *fail.lock().unwrap() = true;
    let collector = PfCollector::new(Box::new(handle), catalog());

    // When: collecting before and after recovery
    let failed = collector.collect();
    *fail.lock().unwrap() = false;
    let recovered = collector.collect();

    // Then: the failure produces nothing and is not remembered
    assert!(failed.is_empty());
    assert_eq!(recovered.len(), 20);
}

#[test]
fn exposition_renders_labeled_queue_lines() {
    // Given: one collection of the interface and queue snapshot
    let catalog = catalog();
    let collector = PfCollector::new(Box::new(FixtureHandle::new(scenario_b())), catalog.clone());
    let samples = collector.collect();

    // When: encoding the families as text
    let text = encode_text(&to_families(&catalog, &samples).unwrap()).unwrap();

    // Then: every family carries HELP and TYPE, queue lines carry both labels
    assert!(text.contains("# TYPE pf_state_total gauge"));
    assert!(text.contains("# TYPE pf_ipv4_bytes_in_total counter"));
    let xmit = text
        .lines()
        .find(|l| l.starts_with("pf_stats_queue_transmitted_bytes_total{"))
        .unwrap();
    assert!(xmit.contains("queue=\"q1\""));
    assert!(xmit.contains("interface=\"em0\""));
    assert!(xmit.ends_with(" 500"));
}

#[test]
fn custom_namespace_prefixes_every_family() {
    // Given: a catalog built for another namespace
    let catalog = DescriptorCatalog::build("firewall").unwrap();
    let collector = PfCollector::new(Box::new(FixtureHandle::new(scenario_b())), catalog);

    // When: gathering the families
    let families = collector.families().unwrap();

    // Then: all 20 names use the namespace
    assert_eq!(families.len(), 20);
    for family in &families {
        assert!(family.get_name().starts_with("firewall_"), "{}", family.get_name());
    }
}
