//! Per-project poll loop
//!
//! Each watched project runs one task:
//! timer tick or native hint → diff cycle → dedup → deliver.
//! Delivery is awaited inside the loop, so a project's next cycle never
//! overlaps its own in-flight batch.

use crate::diff::{DiffEngine, ProjectSettings};
use crate::hints::HintWatcher;
use crate::BatchSink;
use fwatch_core::dedup::deduplicate;
use fwatch_core::path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Timing knobs shared by every project task
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Interval between diff cycles without hints
    pub poll_interval: Duration,

    /// Quiet period after the last native event before an early cycle
    pub hint_quiet_period: Duration,

    /// Use native notifications as hints
    pub use_native_hints: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            hint_quiet_period: Duration::from_millis(1000),
            use_native_hints: true,
        }
    }
}

/// Poll loop for one project
pub struct ProjectReconciler {
    engine: DiffEngine,

    /// Current settings; the sender side lives in the project list
    settings: watch::Receiver<Arc<ProjectSettings>>,

    /// Where batches go
    sink: Arc<dyn BatchSink>,

    options: WatchOptions,

    /// Woken by native hints
    wake: Arc<Notify>,
}

impl ProjectReconciler {
    pub fn new(
        engine: DiffEngine,
        settings: watch::Receiver<Arc<ProjectSettings>>,
        sink: Arc<dyn BatchSink>,
        options: WatchOptions,
    ) -> Self {
        Self {
            engine,
            settings,
            sink,
            options,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Run until the settings sender is dropped
    pub async fn run(mut self) {
        let initial = self.settings.borrow_and_update().clone();
        let project_id = initial.project_id.clone();
        let _hints = self.start_hints(&initial);

        let mut timer = interval(self.options.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Watching {} at {} (interval: {:?})",
            project_id, initial.root, self.options.poll_interval
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                _ = self.wake.notified() => {
                    debug!("Native hint for {}", project_id);
                }
                changed = self.settings.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!("Watch settings updated for {}", project_id);
                }
            }

            let settings = self.settings.borrow_and_update().clone();
            self.run_cycle(&settings).await;
        }

        info!("Stopped watching {}", project_id);
    }

    /// One diff cycle and, if it found anything, one delivery
    async fn run_cycle(&self, settings: &ProjectSettings) {
        let batch = match self.engine.cycle(settings).await {
            Ok(Some(batch)) => batch,
            Ok(None) => return,
            Err(e) => {
                warn!("Diff cycle failed for {}: {:#}", settings.project_id, e);
                return;
            }
        };

        let mut batch = batch;
        batch.events = deduplicate(batch.events);
        if batch.is_empty() {
            return;
        }

        self.sink.deliver(batch).await;
    }

    fn start_hints(&self, settings: &ProjectSettings) -> Option<HintWatcher> {
        if !self.options.use_native_hints {
            return None;
        }

        let result = path::to_local(&settings.root).map_err(anyhow::Error::from).and_then(|root| {
            HintWatcher::start(&root, self.options.hint_quiet_period, self.wake.clone())
        });

        match result {
            Ok(hints) => Some(hints),
            Err(e) => {
                warn!(
                    "Native hints unavailable for {}, polling only: {:#}",
                    settings.project_id, e
                );
                None
            }
        }
    }
}
