//! Push channel client
//!
//! Keeps a WebSocket open to the consumer, forwards `watchChanged` records to
//! the project list, and reconnects with backoff. Every successful connect
//! also asks for a full watch-list fetch, since pushes are not replayed.

use crate::api::ServerApi;
use crate::backoff::Backoff;
use crate::ConfigUpdate;
use futures::{SinkExt, StreamExt};
use fwatch_core::PushMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Interval between `{}` keep-alive messages
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);

type PushStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct PushClient {
    api: ServerApi,
    updates: mpsc::UnboundedSender<ConfigUpdate>,

    /// Asks the watch-list poller for a fetch
    refresh: Arc<Notify>,
}

impl PushClient {
    pub fn new(api: ServerApi, updates: mpsc::UnboundedSender<ConfigUpdate>, refresh: Arc<Notify>) -> Self {
        Self { api, updates, refresh }
    }

    /// Connect, read, reconnect; returns when the update receiver is gone
    pub async fn run(self) {
        let url = self.api.websocket_url();
        let mut backoff = Backoff::new();

        loop {
            match connect_async(url.as_str()).await {
                Ok((stream, _)) => {
                    backoff.reset();
                    info!("Push channel connected to {}", url);
                    self.refresh.notify_one();

                    if !self.session(stream).await {
                        return;
                    }
                    warn!("Push channel to {} closed, reconnecting", url);
                }
                Err(e) => {
                    warn!("Push channel connect to {} failed: {}", url, e);
                }
            }

            backoff.wait().await;
        }
    }

    /// Serve one connection; false once updates can no longer be forwarded
    async fn session(&self, stream: PushStream) -> bool {
        let (mut write, mut read) = stream.split();

        let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
        keepalive.tick().await;

        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if let Err(e) = write.send(Message::text("{}")).await {
                        debug!("Keep-alive failed: {}", e);
                        return true;
                    }
                }
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_push_text(text.as_str(), &self.updates) {
                            return false;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return true,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Push channel error: {}", e);
                        return true;
                    }
                }
            }
        }
    }
}

/// Decode one pushed message; false once the update receiver is gone
pub fn handle_push_text(text: &str, updates: &mpsc::UnboundedSender<ConfigUpdate>) -> bool {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(PushMessage::WatchChanged { projects }) => {
            debug!("Received watch change for {} projects", projects.len());
            updates.send(ConfigUpdate::Changes(projects)).is_ok()
        }
        Ok(PushMessage::Debug { msg }) => {
            info!("Debug message from consumer: {}", msg);
            true
        }
        Err(e) => {
            warn!("Ignoring malformed push message: {}", e);
            true
        }
    }
}
