//! Producer wiring
//!
//! One `Producer` owns the project list and the three background tasks that
//! keep it in sync with the consumer: push client, watch-list poller and the
//! config applier.

use crate::ack::AckSender;
use crate::api::ServerApi;
use crate::client::{BatchTransport, DeliveryClient, HttpTransport, DEFAULT_RETRY_INTERVAL};
use crate::push::PushClient;
use crate::watchlist::{WatchListPoller, WATCH_LIST_REFRESH_INTERVAL};
use crate::apply_config_updates;
use anyhow::{Context, Result};
use snapshot::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;
use watcher::{ProjectList, WatchOptions};

#[derive(Debug, Clone)]
pub struct ProducerOptions {
    /// Consumer base URL
    pub server_url: String,

    /// Wait between failed batch POSTs
    pub retry_interval: Duration,

    /// Interval between unprompted watch-list fetches
    pub watch_list_interval: Duration,

    pub watch: WatchOptions,
}

impl ProducerOptions {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            watch_list_interval: WATCH_LIST_REFRESH_INTERVAL,
            watch: WatchOptions::default(),
        }
    }
}

/// A running producer instance
pub struct Producer {
    projects: Arc<ProjectList>,
    client_uuid: String,
    tasks: Vec<JoinHandle<()>>,
}

impl Producer {
    /// Start against the consumer over HTTP
    pub fn start(options: ProducerOptions, store: Arc<SnapshotStore>) -> Result<Self> {
        let transport = HttpTransport::new(ServerApi::new(&options.server_url))?;
        Self::start_with_transport(options, store, Arc::new(transport))
    }

    /// Start with a custom batch transport
    pub fn start_with_transport(
        options: ProducerOptions,
        store: Arc<SnapshotStore>,
        transport: Arc<dyn BatchTransport>,
    ) -> Result<Self> {
        let api = ServerApi::new(&options.server_url);
        let client_uuid = Uuid::new_v4().to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(crate::client::ATTEMPT_TIMEOUT)
            .timeout(crate::client::ATTEMPT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let delivery = Arc::new(DeliveryClient::new(transport, options.retry_interval));
        let acks = Arc::new(AckSender::new(http.clone(), api.clone(), client_uuid.clone()));
        let projects = Arc::new(ProjectList::new(store, delivery, acks, options.watch.clone()));

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let refresh = Arc::new(Notify::new());

        let poller = WatchListPoller::new(
            http,
            api.clone(),
            updates_tx.clone(),
            refresh.clone(),
            options.watch_list_interval,
        );
        let push = PushClient::new(api, updates_tx, refresh);

        let tasks = vec![
            tokio::spawn(apply_config_updates(updates_rx, projects.clone())),
            tokio::spawn(poller.run()),
            tokio::spawn(push.run()),
        ];

        info!("Producer {} started against {}", client_uuid, options.server_url);

        Ok(Self {
            projects,
            client_uuid,
            tasks,
        })
    }

    pub fn projects(&self) -> &Arc<ProjectList> {
        &self.projects
    }

    pub fn client_uuid(&self) -> &str {
        &self.client_uuid
    }

    /// Stop background tasks and every project task
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.projects.shutdown().await;
        info!("Producer {} stopped", self.client_uuid);
    }
}
