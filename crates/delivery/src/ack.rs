//! Watch-state acknowledgements
//!
//! Each ack is PUT on its own task and retried with backoff until the
//! consumer answers 2xx.

use crate::api::ServerApi;
use crate::backoff::Backoff;
use anyhow::{bail, Context, Result};
use fwatch_core::{WatchAck, WatchStatusBody};
use tracing::{info, warn};
use watcher::AckSink;

#[derive(Clone)]
pub struct AckSender {
    client: reqwest::Client,
    api: ServerApi,

    /// Identifies this producer instance to the consumer
    client_uuid: String,
}

impl AckSender {
    pub fn new(client: reqwest::Client, api: ServerApi, client_uuid: String) -> Self {
        Self {
            client,
            api,
            client_uuid,
        }
    }

    /// One PUT attempt
    pub async fn put_ack(&self, ack: &WatchAck) -> Result<()> {
        let url = self
            .api
            .watch_status_url(&ack.project_id, &ack.watch_state_id, &self.client_uuid);
        let response = self
            .client
            .put(url)
            .json(&WatchStatusBody { success: ack.success })
            .send()
            .await
            .context("Ack request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("consumer answered {}", status);
        }
        Ok(())
    }
}

impl AckSink for AckSender {
    fn send_ack(&self, ack: WatchAck) {
        let sender = self.clone();

        tokio::spawn(async move {
            let mut backoff = Backoff::new();
            loop {
                match sender.put_ack(&ack).await {
                    Ok(()) => {
                        info!(
                            "Acknowledged {} watch state {} (success: {})",
                            ack.project_id, ack.watch_state_id, ack.success
                        );
                        return;
                    }
                    Err(e) => {
                        warn!("Ack for {} failed, retrying: {:#}", ack.project_id, e);
                        backoff.wait().await;
                    }
                }
            }
        });
    }
}
