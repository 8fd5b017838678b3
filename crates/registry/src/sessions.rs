//! Push-channel session fan-out
//!
//! Every connected producer session gets its own unbounded queue, drained by
//! that session's socket task. Broadcasting only enqueues, so a slow session
//! never delays the others, and each socket has exactly one writer.
//! Nothing is replayed to sessions that connect later.

use dashmap::DashMap;
use fwatch_core::PushMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, error};

pub type SessionId = u64;

/// Outbound queues of all connected sessions
#[derive(Default)]
pub struct SessionHub {
    sessions: DashMap<SessionId, mpsc::UnboundedSender<String>>,
    next_id: AtomicU64,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session; the receiver feeds its socket writer
    pub fn register(&self) -> (SessionId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(id, tx);
        debug!("Session {} joined ({} connected)", id, self.sessions.len());
        (id, rx)
    }

    pub fn unregister(&self, id: SessionId) {
        if self.sessions.remove(&id).is_some() {
            debug!("Session {} left ({} connected)", id, self.sessions.len());
        }
    }

    /// Queue a message for every session, pruning the closed ones
    pub fn broadcast(&self, message: &PushMessage) {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode push message: {}", e);
                return;
            }
        };

        self.sessions.retain(|id, tx| {
            let open = tx.send(json.clone()).is_ok();
            if !open {
                debug!("Pruning closed session {}", id);
            }
            open
        });
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
