//! Operator commands against the consumer's project endpoints

use super::server_api;
use anyhow::{bail, Context, Result};
use cli_lib::FwatchConfig;
use fwatch_core::{path, ProjectWatchConfig};
use owo_colors::OwoColorize;
use registry::{WatchState, WatchStatus};
use reqwest::StatusCode;

pub async fn add(
    config: &FwatchConfig,
    server: Option<String>,
    id: &str,
    root: &str,
    ignore_paths: Vec<String>,
    ignore_filenames: Vec<String>,
) -> Result<()> {
    let api = server_api(config, server);
    let watch_config = ProjectWatchConfig::new(id, path::normalize(root).as_str())
        .with_ignored_paths(ignore_paths)
        .with_ignored_filenames(ignore_filenames);
    watch_config.validate()?;

    let response = reqwest::Client::new()
        .put(api.project_watch_url(id))
        .json(&watch_config)
        .send()
        .await
        .context("Failed to reach consumer")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Consumer rejected project {}: {} {}", id, status, body);
    }
    let registered: ProjectWatchConfig = response.json().await.context("Invalid consumer response")?;

    println!(
        "{} Registered {} at {}",
        "✓".green(),
        registered.project_id.cyan(),
        registered.local_root
    );
    println!("  {} {}", "watch state:".dimmed(), registered.watch_state_id);
    Ok(())
}

pub async fn remove(config: &FwatchConfig, server: Option<String>, id: &str) -> Result<()> {
    let api = server_api(config, server);
    let response = reqwest::Client::new()
        .delete(api.project_watch_url(id))
        .send()
        .await
        .context("Failed to reach consumer")?;

    match response.status() {
        status if status.is_success() => {
            println!("{} Removed {}", "✓".green(), id.cyan());
            Ok(())
        }
        StatusCode::NOT_FOUND => bail!("Project {} is not registered", id),
        status => bail!("Consumer answered {}", status),
    }
}

pub async fn status(config: &FwatchConfig, server: Option<String>, id: &str) -> Result<()> {
    let api = server_api(config, server);
    let response = reqwest::Client::new()
        .get(format!("{}/status", api.project_watch_url(id)))
        .send()
        .await
        .context("Failed to reach consumer")?;

    if response.status() == StatusCode::NOT_FOUND {
        bail!("Project {} is not registered", id);
    }
    let status: WatchStatus = response
        .error_for_status()?
        .json()
        .await
        .context("Invalid consumer response")?;

    let state = match status.state {
        WatchState::Watching => "watching".green().to_string(),
        WatchState::PendingAck => "pending ack".yellow().to_string(),
    };
    println!("{}  {}", id.cyan(), state);
    println!("  {} {}", "watch state:".dimmed(), status.watch_state_id);
    Ok(())
}
