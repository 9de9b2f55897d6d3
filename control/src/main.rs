use anyhow::{Context, Result};
use clap::Parser;
use control::apis::gateway::watcher::spawn_watchers;
use control::config::Cli;
use control::dataplane::emitter::{CommandReloader, ConfigEmitter};
use control::event_loop::EventLoop;
use control::status::StatusUpdater;
use kube::Client;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// SILTA control plane
///
/// Watches Gateway API resources and programs the local data plane
/// through a configuration artifact.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.into_config().context("invalid arguments")?;

    info!("Starting SILTA control plane");
    info!("Controller name: {}", config.controller_name);
    info!("GatewayClass: {}", config.gateway_class_name);
    info!("Artifact path: {}", config.config_artifact_path.display());

    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let watchers = spawn_watchers(&client, &events_tx);

    let emitter = ConfigEmitter::new(
        config.secrets_dir.clone(),
        config.config_artifact_path.clone(),
        CommandReloader::new(config.reload_command.clone()),
    );
    let status_updater = StatusUpdater::new(
        client,
        config.controller_name.clone(),
        config.gateway_class_name.clone(),
    );

    let cancel = CancellationToken::new();
    let event_loop = EventLoop::new(events_rx, config, emitter, status_updater);

    tokio::select! {
        _ = event_loop.run(cancel.clone()) => {
            tracing::error!("Event loop exited unexpectedly");
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            cancel.cancel();
        }
    }

    for watcher in watchers {
        watcher.abort();
    }

    Ok(())
}
