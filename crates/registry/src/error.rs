//! Protocol violations detected by the consumer
//!
//! Each one means a producer broke an invariant the change feed relies on.
//! They are logged as severe and latched in `ViolationFlags`, never fatal.

use fwatch_core::EventType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// A batch timestamp went backwards for a project
    #[error("batch {timestamp} for project '{project_id}' is older than already accepted batch {highest}")]
    OutOfOrderBatch {
        project_id: String,
        timestamp: i64,
        highest: i64,
    },

    /// A batch repeats a CREATE or DELETE for a path with nothing in between
    #[error("batch {timestamp} for project '{project_id}' has adjacent duplicate {event_type} events for '{path}'")]
    DuplicateEvents {
        project_id: String,
        timestamp: i64,
        path: String,
        event_type: EventType,
    },

    /// An acknowledged watch state changed its answer
    #[error("ack for project '{project_id}' watch state '{watch_state_id}' flipped to {success}")]
    AckFlip {
        project_id: String,
        watch_state_id: String,
        success: bool,
    },

    /// Events arrived for a project that is not watched
    #[error("batch {timestamp} received for unregistered project '{project_id}'")]
    UnregisteredProject { project_id: String, timestamp: i64 },
}

/// Latched record of every violation kind seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationFlags {
    pub has_ordering_violation: bool,
    pub has_duplicate_violation: bool,
    pub has_ack_flip: bool,
    pub has_unregistered_batch: bool,
}

impl ViolationFlags {
    pub fn any(&self) -> bool {
        self.has_ordering_violation || self.has_duplicate_violation || self.has_ack_flip || self.has_unregistered_batch
    }

    pub(crate) fn latch(&mut self, violation: &ProtocolViolation) {
        match violation {
            ProtocolViolation::OutOfOrderBatch { .. } => self.has_ordering_violation = true,
            ProtocolViolation::DuplicateEvents { .. } => self.has_duplicate_violation = true,
            ProtocolViolation::AckFlip { .. } => self.has_ack_flip = true,
            ProtocolViolation::UnregisteredProject { .. } => self.has_unregistered_batch = true,
        }
    }
}
