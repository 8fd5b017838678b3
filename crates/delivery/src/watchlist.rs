//! Full watch-list fetches
//!
//! The producer GETs the complete watch-list at startup, after every push
//! channel (re)connect, and on a fixed interval, so a missed push is repaired
//! on the next fetch.

use crate::api::ServerApi;
use crate::backoff::Backoff;
use crate::ConfigUpdate;
use anyhow::{bail, Context, Result};
use fwatch_core::WatchList;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

/// Interval between unprompted watch-list fetches
pub const WATCH_LIST_REFRESH_INTERVAL: Duration = Duration::from_secs(120);

/// One GET of the watch-list
pub async fn fetch_watch_list(client: &reqwest::Client, api: &ServerApi) -> Result<WatchList> {
    let response = client
        .get(api.watch_list_url())
        .send()
        .await
        .context("Watch-list request failed")?;

    let status = response.status();
    if !status.is_success() {
        bail!("consumer answered {}", status);
    }

    response.json::<WatchList>().await.context("Malformed watch-list")
}

/// Periodic and on-demand watch-list fetcher
pub struct WatchListPoller {
    client: reqwest::Client,
    api: ServerApi,
    updates: mpsc::UnboundedSender<ConfigUpdate>,

    /// Notified by the push client after each (re)connect
    refresh: Arc<Notify>,

    interval: Duration,
}

impl WatchListPoller {
    pub fn new(
        client: reqwest::Client,
        api: ServerApi,
        updates: mpsc::UnboundedSender<ConfigUpdate>,
        refresh: Arc<Notify>,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            api,
            updates,
            refresh,
            interval,
        }
    }

    /// Fetch forever; returns when the update receiver is gone
    pub async fn run(self) {
        let mut backoff = Backoff::new();

        loop {
            match fetch_watch_list(&self.client, &self.api).await {
                Ok(list) => {
                    backoff.reset();
                    info!("Fetched watch-list ({} projects)", list.projects.len());
                    if self.updates.send(ConfigUpdate::WatchList(list)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Watch-list fetch failed, retrying: {:#}", e);
                    backoff.wait().await;
                    continue;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.refresh.notified() => {
                    debug!("Watch-list refresh requested");
                }
            }
        }
    }
}
