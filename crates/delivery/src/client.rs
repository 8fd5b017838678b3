//! Batch delivery with infinite retry
//!
//! A batch is encoded once and posted until the consumer accepts it. Failed
//! attempts wait a fixed interval and resend the identical payload, so
//! batches are never dropped, reordered or split.

use crate::api::ServerApi;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use fwatch_core::codec::encode_events;
use fwatch_core::{ChangeBatch, FileChangeMessage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use watcher::BatchSink;

/// Per-attempt connect and request timeout
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait between failed attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// One POST attempt of an encoded batch
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// `Ok` only when the consumer answered 2xx
    async fn post(&self, project_id: &str, timestamp_millis: i64, body: &FileChangeMessage) -> Result<()>;
}

/// `reqwest` transport against a consumer server
pub struct HttpTransport {
    client: reqwest::Client,
    api: ServerApi,
}

impl HttpTransport {
    pub fn new(api: ServerApi) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(ATTEMPT_TIMEOUT)
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, api })
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn post(&self, project_id: &str, timestamp_millis: i64, body: &FileChangeMessage) -> Result<()> {
        let response = self
            .client
            .post(self.api.file_changes_url(project_id, timestamp_millis))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("consumer answered {}", status);
        }
        Ok(())
    }
}

/// Delivers batches through a transport, retrying forever
pub struct DeliveryClient {
    transport: Arc<dyn BatchTransport>,
    retry_interval: Duration,
}

impl DeliveryClient {
    pub fn new(transport: Arc<dyn BatchTransport>, retry_interval: Duration) -> Self {
        Self {
            transport,
            retry_interval,
        }
    }

    /// Send a batch and return once the consumer has accepted it
    ///
    /// Only encoding can fail; transport failures are retried.
    pub async fn send(&self, batch: &ChangeBatch) -> fwatch_core::Result<u32> {
        let body = FileChangeMessage {
            msg: encode_events(&batch.events)?,
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self
                .transport
                .post(&batch.project_id, batch.batch_timestamp_millis, &body)
                .await
            {
                Ok(()) => {
                    debug!(
                        "Delivered {} events for {}@{} after {} attempt(s)",
                        batch.len(),
                        batch.project_id,
                        batch.batch_timestamp_millis,
                        attempts
                    );
                    if attempts > 1 {
                        info!("Delivery to consumer recovered for {}", batch.project_id);
                    }
                    return Ok(attempts);
                }
                Err(e) => {
                    if attempts == 1 || attempts % 50 == 0 {
                        warn!(
                            "Delivery of {}@{} failed (attempt {}), retrying: {:#}",
                            batch.project_id, batch.batch_timestamp_millis, attempts, e
                        );
                    }
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }
}

#[async_trait]
impl BatchSink for DeliveryClient {
    async fn deliver(&self, batch: ChangeBatch) {
        if let Err(e) = self.send(&batch).await {
            error!("Could not encode batch for {}: {}", batch.project_id, e);
        }
    }
}
