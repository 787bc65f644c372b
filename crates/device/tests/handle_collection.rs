//! Device crate handles driven through the core collector.

use pf_exporter_core::catalog::DEFAULT_NAMESPACE;
use pf_exporter_core::snapshot::{QueueCounters, QueueEntry, StateCounters, StatisticsSnapshot};
use pf_exporter_core::{DescriptorCatalog, PfCollector};
use pf_exporter_device::{PfDevice, SnapshotFile};

fn catalog() -> DescriptorCatalog {
    DescriptorCatalog::build(DEFAULT_NAMESPACE).unwrap()
}

fn write_snapshot(path: &std::path::Path, snapshot: &StatisticsSnapshot) {
    std::fs::write(path, serde_json::to_string_pretty(snapshot).unwrap()).unwrap();
}

#[test]
fn snapshot_file_changes_are_visible_on_the_next_scrape() {
    // Given: a snapshot file with two queues
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut snapshot = StatisticsSnapshot {
        state: StateCounters {
            total: 42,
            ..Default::default()
        },
        interface: None,
        queues: Some(vec![
            QueueEntry {
                name: "std".to_owned(),
                interface: "vio0".to_owned(),
                stats: QueueCounters::default(),
            },
            QueueEntry {
                name: "ssh".to_owned(),
                interface: "vio0".to_owned(),
                stats: QueueCounters::default(),
            },
        ]),
    };
    write_snapshot(file.path(), &snapshot);
    let collector = PfCollector::new(Box::new(SnapshotFile::new(file.path())), catalog());

    // When: scraping, dropping a queue, and scraping again
    let first = collector.collect();
    snapshot.queues.as_mut().unwrap().pop();
    write_snapshot(file.path(), &snapshot);
    let second = collector.collect();

    // Then: the vanished queue has no samples in the second scrape
    assert_eq!(first.len(), 4 + 2 * 4);
    assert_eq!(second.len(), 4 + 4);
    assert!(second.iter().all(|s| s.labels().first().map(String::as_str) != Some("ssh")));
}

#[test]
fn deleted_snapshot_file_yields_an_empty_scrape() {
    // Given: a snapshot file that disappears after the collector is built
    let file = tempfile::NamedTempFile::new().unwrap();
    write_snapshot(file.path(), &StatisticsSnapshot::default());
    let path = file.path().to_owned();
    let collector = PfCollector::new(Box::new(SnapshotFile::new(&path)), catalog());
    drop(file);

    // When: scraping
    let samples = collector.collect();

    // Then: the failure is absorbed
    assert!(samples.is_empty());
}

#[test]
fn device_without_a_binding_yields_an_empty_scrape_but_full_describe() {
    // Given: a device handle on an ordinary file
    let file = tempfile::NamedTempFile::new().unwrap();
    let device = PfDevice::open(file.path()).unwrap();
    let collector = PfCollector::new(Box::new(device), catalog());

    // When / Then: describe advertises every metric, collect yields nothing
    assert_eq!(collector.describe().count(), 20);
    assert!(collector.collect().is_empty());
}
