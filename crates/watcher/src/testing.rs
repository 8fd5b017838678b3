//! Recording sinks for unit tests

use crate::{AckSink, BatchSink};
use async_trait::async_trait;
use fwatch_core::{ChangeBatch, WatchAck};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
pub struct RecordingSink {
    batches: Mutex<VecDeque<ChangeBatch>>,
    arrived: Notify,
}

impl RecordingSink {
    /// Oldest undelivered-to-test batch, waiting up to `timeout`
    pub async fn wait_for_batch(&self, timeout: Duration) -> Option<ChangeBatch> {
        tokio::time::timeout(timeout, async {
            loop {
                if let Some(batch) = self.batches.lock().pop_front() {
                    return batch;
                }
                self.arrived.notified().await;
            }
        })
        .await
        .ok()
    }
}

#[async_trait]
impl BatchSink for RecordingSink {
    async fn deliver(&self, batch: ChangeBatch) {
        self.batches.lock().push_back(batch);
        self.arrived.notify_one();
    }
}

#[derive(Default)]
pub struct RecordingAcks {
    pub acks: Mutex<Vec<WatchAck>>,
}

impl AckSink for RecordingAcks {
    fn send_ack(&self, ack: WatchAck) {
        self.acks.lock().push(ack);
    }
}
