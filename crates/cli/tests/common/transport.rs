//! Fault-injecting batch transport

use anyhow::{bail, Result};
use async_trait::async_trait;
use delivery::{BatchTransport, HttpTransport, ServerApi};
use fwatch_core::FileChangeMessage;
use parking_lot::Mutex;

/// Fails the next `failures` attempts, then posts over HTTP
pub struct FaultyTransport {
    inner: HttpTransport,
    failures: Mutex<u32>,

    /// Every attempt as `(project id, batch timestamp, accepted)`
    pub attempts: Mutex<Vec<(String, i64, bool)>>,
}

impl FaultyTransport {
    pub fn new(server_url: &str, failures: u32) -> Result<Self> {
        Ok(Self {
            inner: HttpTransport::new(ServerApi::new(server_url))?,
            failures: Mutex::new(failures),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn fail_next(&self, failures: u32) {
        *self.failures.lock() = failures;
    }

    /// Timestamps of attempts that reached the consumer
    pub fn accepted(&self) -> Vec<i64> {
        self.attempts
            .lock()
            .iter()
            .filter(|(_, _, accepted)| *accepted)
            .map(|(_, ts, _)| *ts)
            .collect()
    }

    pub fn failed_attempts(&self) -> usize {
        self.attempts.lock().iter().filter(|(_, _, accepted)| !*accepted).count()
    }
}

#[async_trait]
impl BatchTransport for FaultyTransport {
    async fn post(&self, project_id: &str, timestamp_millis: i64, body: &FileChangeMessage) -> Result<()> {
        let inject = {
            let mut failures = self.failures.lock();
            let inject = *failures > 0;
            if inject {
                *failures -= 1;
            }
            inject
        };
        if inject {
            self.attempts.lock().push((project_id.to_string(), timestamp_millis, false));
            bail!("injected transport failure");
        }

        self.inner.post(project_id, timestamp_millis, body).await?;
        self.attempts.lock().push((project_id.to_string(), timestamp_millis, true));
        Ok(())
    }
}
