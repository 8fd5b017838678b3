//! Consumer side of fwatch
//!
//! This crate provides:
//! - The watch registry with its watch-state acknowledgement lifecycle
//! - The delivery sink that checks ordering and duplicate invariants
//! - Push-channel session fan-out
//! - The axum server exposing all of the above

pub mod error;
pub mod sessions;
pub mod registry;
pub mod sink;
pub mod server;

// Re-exports
pub use error::{ProtocolViolation, ViolationFlags};
pub use registry::{AckOutcome, WatchRegistry, WatchState, WatchStatus};
pub use sessions::SessionHub;
pub use sink::{DeliveredBatch, DeliverySink, DEFAULT_LOG_CAPACITY};
pub use server::{router, serve};

use parking_lot::Mutex;
use crate::registry::Ledger;
use std::sync::Arc;

/// Result type used throughout the registry
pub type Result<T> = anyhow::Result<T>;

/// Everything the consumer endpoints share
#[derive(Clone)]
pub struct ConsumerState {
    pub registry: Arc<WatchRegistry>,
    pub sink: Arc<DeliverySink>,
    pub sessions: Arc<SessionHub>,
}

impl ConsumerState {
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_log_capacity(capacity: usize) -> Self {
        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let sessions = Arc::new(SessionHub::new());
        Self {
            registry: Arc::new(WatchRegistry::new(ledger.clone(), sessions.clone())),
            sink: Arc::new(DeliverySink::new(ledger, capacity)),
            sessions,
        }
    }
}

impl Default for ConsumerState {
    fn default() -> Self {
        Self::new()
    }
}
