//! dockwall CLI library.
//!
//! `main.rs` only parses arguments and maps errors to exit codes;
//! everything else lives here so integration tests can drive it.
//!
//! # Flow
//!
//! ```text
//! Cli ──▶ RunOptions + DockwallConfig ──▶ logging / metrics
//!                                           │
//!            ┌──────────── --inspect ───────┤
//!            ▼                              ▼
//!      InspectReport               Controller::run_pass  (once)
//!                                  run_monitor           (--monitor)
//! ```

pub mod artifact;
pub mod cli;
pub mod controller;
pub mod error;
pub mod executor;
pub mod inspect;
pub mod logging;
pub mod metrics_server;
pub mod options;
pub mod output;
pub mod shutdown;

use std::sync::Arc;

use dockwall_docker::{BollardDockerClient, MonitorConfig, load_inventory};
use tracing::info;

use crate::cli::Cli;
use crate::controller::{Controller, run_monitor};
use crate::error::CliError;
use crate::inspect::InspectReport;
use crate::options::{RunOptions, load_config};
use crate::output::OutputWriter;
use crate::shutdown::ShutdownSignal;

/// Runs dockwall with parsed arguments.
///
/// # Errors
///
/// Any [`CliError`]; the caller maps it to an exit code.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let options = RunOptions::from_cli(&cli)?;
    let config = load_config(&cli).await?;

    logging::init_tracing(&config.general)?;
    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let monitor_config = MonitorConfig::from_core(&config.docker);
    let client = Arc::new(BollardDockerClient::connect(&monitor_config)?);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if cli.inspect {
        let inventory = load_inventory(client.as_ref()).await?;
        OutputWriter::new(cli.inspect_format).render(&mut out, &InspectReport::new(&inventory))?;
        return Ok(());
    }

    info!(
        update = options.mode.update,
        flush = options.mode.flush,
        restore = options.mode.restore,
        monitor = options.monitor,
        "dockwall starting"
    );

    let mut controller = Controller::new(Arc::clone(&client), options, &config.firewall);

    if controller.options().monitor {
        let mut signals = ShutdownSignal::install()?;
        let shutdown = async move {
            let signal = signals.recv().await;
            info!(signal, "shutdown signal received");
        };
        run_monitor(&mut controller, client, monitor_config, &mut out, shutdown).await
    } else {
        controller.run_pass(&mut out).await.map(|_| ())
    }
}
