//! Run the producer until Ctrl-C

use anyhow::{Context, Result};
use cli_lib::FwatchConfig;
use delivery::Producer;
use snapshot::SnapshotStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub async fn run(config: &FwatchConfig, server: Option<String>, state_dir: Option<PathBuf>) -> Result<()> {
    let mut options = config.producer.options();
    if let Some(server) = server {
        options.server_url = server;
    }
    let state_dir = state_dir.unwrap_or_else(|| config.producer.state_dir());

    let store = Arc::new(SnapshotStore::open(&state_dir)?);
    info!("Snapshots stored in {}", state_dir.display());

    let producer = Producer::start(options, store)?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down producer");
    producer.shutdown().await;
    Ok(())
}
