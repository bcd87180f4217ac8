//! cfdeploy - Entry Point
//!
//! Deploys the todos reference topologies to Cloud Foundry.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use cfdeploy::app::output;
use cfdeploy::app::run::run;
use cfdeploy::cli::Cli;
use cfdeploy::errors::DeployerError;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            // Rejected before any remote call
            let rejected = e
                .downcast_ref::<DeployerError>()
                .is_some_and(DeployerError::is_planning_error);
            ExitCode::from(if rejected { 2 } else { 1 })
        }
    }
}

async fn try_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let succeeded = run(cli, cancel).await?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = await_shutdown_signal().await {
        warn!("Cannot listen for shutdown signals: {}", e);
        return;
    }
    info!("Cancelling run...");
    cancel.cancel();
}

async fn await_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Ctrl+C received, shutting down...");
    }

    Ok(())
}
