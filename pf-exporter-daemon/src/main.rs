use anyhow::Result;
use clap::Parser;

use pf_exporter_daemon::cli::DaemonCli;
use pf_exporter_daemon::logging;
use pf_exporter_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // CLI flags > env > file > defaults
    let config = cli.resolve_config().await?;

    if cli.validate {
        println!("configuration is valid");
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "pf-exporter starting");

    let orchestrator = Orchestrator::build_from_config(config).inspect_err(|e| {
        tracing::error!(error = %e, "startup failed");
    })?;

    if cli.once {
        print!("{}", orchestrator.collect_once()?);
        return Ok(());
    }

    orchestrator.run().await
}
