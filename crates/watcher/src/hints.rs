//! Native filesystem notifications used as diff-cycle hints
//!
//! Events only schedule an early cycle. The poll loop still runs on its
//! timer, so a lost or coalesced notification delays a change but never
//! hides it.

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Recursive native watcher on one project root
///
/// Dropping it stops both the watcher and its quiet-period task.
pub struct HintWatcher {
    _watcher: RecommendedWatcher,
    quiet_task: JoinHandle<()>,
}

impl HintWatcher {
    /// Start watching `root`; `wake` is notified once events settle for `quiet_period`
    pub fn start(root: &Path, quiet_period: Duration, wake: Arc<Notify>) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(_) => {
                    let _ = event_tx.send(());
                }
                Err(e) => warn!("Native watcher error: {}", e),
            },
            Config::default(),
        )
        .context("Failed to create native watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        debug!("Native hints enabled for {}", root.display());

        let quiet_task = tokio::spawn(settle_and_wake(event_rx, quiet_period, wake));

        Ok(Self {
            _watcher: watcher,
            quiet_task,
        })
    }
}

impl Drop for HintWatcher {
    fn drop(&mut self) {
        self.quiet_task.abort();
    }
}

/// Wake the poll loop once no event has arrived for `quiet_period`
///
/// Each new event restarts the quiet period.
async fn settle_and_wake(mut events: mpsc::UnboundedReceiver<()>, quiet_period: Duration, wake: Arc<Notify>) {
    while events.recv().await.is_some() {
        loop {
            match tokio::time::timeout(quiet_period, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }
        wake.notify_one();
    }
}
