//! Change detection for fwatch projects
//!
//! This crate provides:
//! - Tree walking into project-relative snapshot entries
//! - Snapshot diffing into CREATE/MODIFY/DELETE batches
//! - A poll loop per project, nudged early by native notifications
//! - The producer's project list, driven by watch-list updates

pub mod walk;
pub mod diff;
pub mod hints;
pub mod reconcile;
pub mod projects;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use fwatch_core::{ChangeBatch, WatchAck};

pub use diff::{DiffEngine, DiffOutcome, ProjectSettings};
pub use projects::ProjectList;
pub use reconcile::{ProjectReconciler, WatchOptions};

/// Destination for change batches
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Resolves once the batch has been accepted
    ///
    /// Implementations retry internally; a batch is never dropped.
    async fn deliver(&self, batch: ChangeBatch);
}

/// Destination for watch-state acknowledgements
pub trait AckSink: Send + Sync {
    /// Queue an acknowledgement without waiting for it to be sent
    fn send_ack(&self, ack: WatchAck);
}
