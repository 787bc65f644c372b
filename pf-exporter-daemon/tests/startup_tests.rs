//! Startup wiring tests: configuration to a collecting exporter.

use std::io::Write;

use clap::Parser;
use pf_exporter_core::config::PfExporterConfig;
use pf_exporter_daemon::cli::DaemonCli;
use pf_exporter_daemon::orchestrator::Orchestrator;

const SNAPSHOT: &str = r#"{
  "state": { "total": 10, "searches": 100, "inserts": 50, "removals": 40 },
  "interface": null,
  "queues": null
}"#;

fn snapshot_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SNAPSHOT.as_bytes()).unwrap();
    file
}

#[test]
fn once_mode_prints_the_snapshot_as_text() {
    // Given: a config pointing at a snapshot file
    let file = snapshot_file();
    let mut config = PfExporterConfig::default();
    config.pf.snapshot_file = Some(file.path().display().to_string());

    // When: building the exporter and collecting once
    let orchestrator = Orchestrator::build_from_config(config).unwrap();
    let text = orchestrator.collect_once().unwrap();

    // Then: the four state metrics are rendered and nothing else
    assert!(text.contains("pf_state_total 10\n"));
    assert!(text.contains("pf_state_searches_total 100\n"));
    assert!(text.contains("pf_state_inserts_total 50\n"));
    assert!(text.contains("pf_state_removals_total 40\n"));
    assert!(!text.contains("pf_ipv4_"));
    assert!(!text.contains("pf_stats_queue_"));
}

#[test]
fn once_mode_reports_read_failures() {
    // Given: a snapshot file that is removed after startup
    let file = snapshot_file();
    let mut config = PfExporterConfig::default();
    config.pf.snapshot_file = Some(file.path().display().to_string());
    let orchestrator = Orchestrator::build_from_config(config).unwrap();
    drop(file);

    // When: collecting once
    let err = orchestrator.collect_once().unwrap_err();

    // Then: the error is surfaced instead of an empty body
    assert!(err.to_string().contains("failed to get pf stats"));
}

#[test]
fn missing_device_is_fatal() {
    // Given: a device path that does not exist
    let mut config = PfExporterConfig::default();
    config.pf.device = "/nonexistent/dev/pf".to_owned();

    // When: building the exporter
    let result = Orchestrator::build_from_config(config);

    // Then: startup fails naming the device
    let err = result.err().unwrap();
    assert!(err.to_string().contains("/nonexistent/dev/pf"));
}

#[test]
fn invalid_config_is_rejected_before_opening() {
    let mut config = PfExporterConfig::default();
    config.web.telemetry_path = "/".to_owned();

    let err = Orchestrator::build_from_config(config).err().unwrap();

    assert!(err.to_string().contains("config validation failed"));
}

#[test]
fn custom_namespace_and_path_flow_from_the_cli() {
    // Given: CLI flags selecting a snapshot file and another telemetry path
    let file = snapshot_file();
    let path = file.path().display().to_string();
    let cli = DaemonCli::try_parse_from([
        "pf-exporter",
        "--pf.snapshot-file",
        path.as_str(),
        "--web.telemetry-path",
        "/pf",
    ])
    .unwrap();
    let mut config = PfExporterConfig::default();
    config.pf.namespace = "firewall".to_owned();

    // When: applying the flags and building
    cli.apply_overrides(&mut config);
    let orchestrator = Orchestrator::build_from_config(config).unwrap();

    // Then: the namespace prefixes every metric
    assert_eq!(orchestrator.config().web.telemetry_path, "/pf");
    let text = orchestrator.collect_once().unwrap();
    assert!(text.contains("firewall_state_total 10\n"));
}

#[tokio::test]
async fn build_loads_a_config_file() {
    // Given: a TOML file naming a snapshot source
    let snapshot = snapshot_file();
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        "[pf]\nsnapshot_file = {:?}\n\n[exporter_metrics]\nenabled = false",
        snapshot.path().display().to_string()
    )
    .unwrap();

    // When: building from the file
    let orchestrator = Orchestrator::build(config_file.path()).await.unwrap();

    // Then: the file's values are in effect
    assert!(!orchestrator.config().exporter_metrics.enabled);
    assert!(orchestrator.collect_once().is_ok());
}

#[tokio::test]
async fn cli_flag_repairs_invalid_file_value() {
    // Given: a file with the reserved telemetry path
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[web]\ntelemetry_path = \"/\"").unwrap();
    let config_path = file.path().display().to_string();

    // When: the flag supplies a valid path
    let cli = DaemonCli::try_parse_from([
        "pf-exporter",
        "--config",
        config_path.as_str(),
        "--web.telemetry-path",
        "/metrics",
    ])
    .unwrap();
    let config = cli.resolve_config().await.unwrap();

    // Then: the flag wins and the merged config validates
    assert_eq!(config.web.telemetry_path, "/metrics");
}

#[tokio::test]
async fn invalid_file_value_without_override_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[web]\ntelemetry_path = \"/\"").unwrap();
    let config_path = file.path().display().to_string();

    let cli = DaemonCli::try_parse_from(["pf-exporter", "--config", config_path.as_str()]).unwrap();
    let err = cli.resolve_config().await.unwrap_err();

    assert!(err.to_string().contains("config validation failed"));
}
