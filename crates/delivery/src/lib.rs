//! Producer-side networking for fwatch
//!
//! This crate provides:
//! - Batch delivery over HTTP with infinite fixed-interval retry
//! - Watch-list fetches and the push channel client
//! - Watch-state acknowledgements
//! - `Producer`, which wires these to a watcher project list

pub mod api;
pub mod backoff;
pub mod client;
pub mod ack;
pub mod watchlist;
pub mod push;
pub mod producer;

use fwatch_core::{ProjectChange, WatchList};
use std::sync::Arc;
use tokio::sync::mpsc;
use watcher::ProjectList;

pub use api::ServerApi;
pub use backoff::Backoff;
pub use client::{BatchTransport, DeliveryClient, HttpTransport};
pub use producer::{Producer, ProducerOptions};

/// Configuration arriving from the consumer
#[derive(Debug)]
pub enum ConfigUpdate {
    /// Full watch-list from a GET
    WatchList(WatchList),

    /// Records of one `watchChanged` push
    Changes(Vec<ProjectChange>),
}

/// Apply config updates one at a time, in arrival order
pub async fn apply_config_updates(mut updates: mpsc::UnboundedReceiver<ConfigUpdate>, projects: Arc<ProjectList>) {
    while let Some(update) = updates.recv().await {
        match update {
            ConfigUpdate::WatchList(list) => projects.apply_watch_list(list).await,
            ConfigUpdate::Changes(changes) => projects.apply_changes(changes).await,
        }
    }
}
