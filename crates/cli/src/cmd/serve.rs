//! Run the consumer server until Ctrl-C

use anyhow::{Context, Result};
use cli_lib::FwatchConfig;
use registry::ConsumerState;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub async fn run(config: &FwatchConfig, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.consumer.bind.clone());
    let state = ConsumerState::new();

    for seed in &config.consumer.projects {
        let registered = state
            .registry
            .register(seed.to_watch_config())
            .with_context(|| format!("Failed to register project '{}'", seed.project_id))?;
        info!(
            "Seeded project {} at {} (watch state {})",
            registered.project_id, registered.local_root, registered.watch_state_id
        );
    }

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    let flags_state = state.clone();
    registry::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down consumer");
    })
    .await?;

    let flags = flags_state.sink.flags();
    if flags.any() {
        warn!("Protocol violations were observed: {:?}", flags);
    }
    Ok(())
}
