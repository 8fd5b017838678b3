//! Exponential backoff for the config channel
//!
//! Starts at 200 ms, grows by 1.5x per failure, caps at 4 s and resets on success.

use std::time::Duration;

const MIN_DELAY_MS: u64 = 200;
const MAX_DELAY_MS: u64 = 4000;

#[derive(Debug, Clone)]
pub struct Backoff {
    current_ms: u64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            current_ms: MIN_DELAY_MS,
        }
    }

    /// Delay to wait after the current failure
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_ms;
        self.current_ms = (self.current_ms * 3 / 2).min(MAX_DELAY_MS);
        Duration::from_millis(delay)
    }

    /// Sleep for the next delay
    pub async fn wait(&mut self) {
        tokio::time::sleep(self.next_delay()).await;
    }

    pub fn reset(&mut self) {
        self.current_ms = MIN_DELAY_MS;
    }
}
