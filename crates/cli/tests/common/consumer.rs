//! In-process consumer on a loopback port

use anyhow::Result;
use delivery::ProducerOptions;
use fwatch_core::{path, ChangeEvent, ProjectWatchConfig};
use registry::{ConsumerState, WatchState};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use watcher::WatchOptions;

/// Consumer server that stops when dropped
pub struct TestConsumer {
    pub state: ConsumerState,
    pub url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestConsumer {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let state = ConsumerState::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_state = state.clone();
        tokio::spawn(async move {
            let _ = registry::serve(listener, server_state, async {
                let _ = shutdown_rx.await;
            })
            .await;
        });

        Ok(Self {
            state,
            url,
            shutdown: Some(shutdown_tx),
        })
    }

    /// Register `root` under `project_id` with optional filters
    pub fn register(&self, project_id: &str, root: &Path, ignored_filenames: &[&str]) -> ProjectWatchConfig {
        let config = ProjectWatchConfig::new(project_id, path::normalize(&root.to_string_lossy()).as_str())
            .with_ignored_filenames(ignored_filenames.iter().map(|s| s.to_string()).collect());
        self.state.registry.register(config).expect("valid test config")
    }

    /// Poll the delivered log until `done` holds or the timeout passes
    pub async fn wait_for<F>(&self, project_id: &str, timeout: Duration, done: F) -> Vec<ChangeEvent>
    where
        F: Fn(&[ChangeEvent]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let events = self.state.sink.delivered(project_id);
            if done(&events) || Instant::now() >= deadline {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Wait until the project reaches `state` with the given watch state id
    pub async fn wait_for_state(
        &self,
        project_id: &str,
        watch_state_id: &str,
        state: WatchState,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(status) = self.state.registry.status(project_id) {
                if status.state == state && status.watch_state_id == watch_state_id {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

impl Drop for TestConsumer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Producer options with short intervals and no native hints
pub fn fast_options(server_url: &str) -> ProducerOptions {
    let mut options = ProducerOptions::new(server_url);
    options.retry_interval = Duration::from_millis(20);
    options.watch = WatchOptions {
        poll_interval: Duration::from_millis(100),
        hint_quiet_period: Duration::from_millis(50),
        use_native_hints: false,
    };
    options
}

/// Events as `(marker, path)` pairs, e.g. `('+', "/a.txt")`
pub fn summary(events: &[ChangeEvent]) -> Vec<(char, String)> {
    events
        .iter()
        .map(|e| (e.event_type.marker(), e.path.to_string()))
        .collect()
}
