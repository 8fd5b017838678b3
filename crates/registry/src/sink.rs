//! Accepted change batches and their invariant checks
//!
//! A batch that breaks an invariant is still recorded; the violation is
//! logged and latched so a test harness can assert on it afterwards.

use crate::error::{ProtocolViolation, ViolationFlags};
use crate::registry::SharedLedger;
use fwatch_core::dedup::contains_adjacent_duplicates;
use fwatch_core::{ChangeBatch, ChangeEvent};
use tracing::{debug, error};

/// Batches kept in memory before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// One accepted batch
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredBatch {
    pub batch: ChangeBatch,

    /// Whether the batch tripped a violation
    pub flagged: bool,
}

pub struct DeliverySink {
    ledger: SharedLedger,
    capacity: usize,
}

impl DeliverySink {
    pub(crate) fn new(ledger: SharedLedger, capacity: usize) -> Self {
        Self {
            ledger,
            capacity: capacity.max(1),
        }
    }

    /// Check and record a batch
    ///
    /// Returns the first violation found. Batches for unregistered projects
    /// are not recorded.
    pub fn accept(&self, batch: ChangeBatch) -> Result<(), ProtocolViolation> {
        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;
        let project_id = batch.project_id.clone();
        let timestamp = batch.batch_timestamp_millis;

        if !ledger.projects.contains_key(&project_id) {
            let violation = ProtocolViolation::UnregisteredProject { project_id, timestamp };
            ledger.flags.latch(&violation);
            error!("SEVERE: {}", violation);
            return Err(violation);
        }

        let mut violations = Vec::new();
        if let Some(&highest) = ledger.highest_timestamps.get(&project_id) {
            if timestamp < highest {
                violations.push(ProtocolViolation::OutOfOrderBatch {
                    project_id: project_id.clone(),
                    timestamp,
                    highest,
                });
            }
        }
        if let Some(duplicate) = contains_adjacent_duplicates(&batch.events) {
            violations.push(ProtocolViolation::DuplicateEvents {
                project_id: project_id.clone(),
                timestamp,
                path: duplicate.path.to_string(),
                event_type: duplicate.event_type,
            });
        }
        for violation in &violations {
            ledger.flags.latch(violation);
            error!("SEVERE: {}", violation);
        }

        let highest = ledger.highest_timestamps.entry(project_id.clone()).or_insert(timestamp);
        *highest = (*highest).max(timestamp);

        debug!("Accepted {} events for {}@{}", batch.len(), project_id, timestamp);
        if ledger.delivered.len() >= self.capacity {
            ledger.delivered.pop_front();
        }
        ledger.delivered.push_back(DeliveredBatch {
            batch,
            flagged: !violations.is_empty(),
        });

        match violations.into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    /// Events accepted for a project, in arrival order
    pub fn delivered(&self, project_id: &str) -> Vec<ChangeEvent> {
        self.ledger
            .lock()
            .delivered
            .iter()
            .filter(|d| d.batch.project_id == project_id)
            .flat_map(|d| d.batch.events.iter().cloned())
            .collect()
    }

    pub fn delivered_batches(&self, project_id: &str) -> Vec<DeliveredBatch> {
        self.ledger
            .lock()
            .delivered
            .iter()
            .filter(|d| d.batch.project_id == project_id)
            .cloned()
            .collect()
    }

    /// Forget delivered batches and reset the violation flags
    pub fn clear_delivered(&self) {
        let mut ledger = self.ledger.lock();
        ledger.delivered.clear();
        ledger.flags = ViolationFlags::default();
    }

    pub fn flags(&self) -> ViolationFlags {
        self.ledger.lock().flags
    }
}
