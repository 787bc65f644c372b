//! pf-exporter daemon library.
//!
//! Exposes the daemon's modules for integration testing. In production
//! the `pf-exporter` binary (main.rs) drives them.

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
