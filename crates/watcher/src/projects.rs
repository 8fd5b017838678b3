//! Producer-side project list
//!
//! Applies full watch-lists and pushed deltas, starts and stops one
//! reconciler task per project, and acknowledges each watch-state generation.

use crate::diff::{DiffEngine, ProjectSettings};
use crate::reconcile::{ProjectReconciler, WatchOptions};
use crate::{AckSink, BatchSink};
use ahash::AHashMap;
use fwatch_core::{ProjectChange, ProjectWatchConfig, WatchAck, WatchList};
use parking_lot::Mutex;
use snapshot::SnapshotStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A running project
struct WatchedProject {
    /// Last accepted configuration
    config: ProjectWatchConfig,

    /// Feeds settings updates to the reconciler
    settings: watch::Sender<Arc<ProjectSettings>>,

    task: JoinHandle<()>,
}

/// What an incoming configuration means for a project
enum Transition {
    Start,
    Restart,
    Update,
    Unchanged,
}

/// Watched projects of one producer instance
pub struct ProjectList {
    engine: DiffEngine,
    store: Arc<SnapshotStore>,
    sink: Arc<dyn BatchSink>,
    acks: Arc<dyn AckSink>,
    options: WatchOptions,
    projects: Mutex<AHashMap<String, WatchedProject>>,
}

impl ProjectList {
    pub fn new(
        store: Arc<SnapshotStore>,
        sink: Arc<dyn BatchSink>,
        acks: Arc<dyn AckSink>,
        options: WatchOptions,
    ) -> Self {
        Self {
            engine: DiffEngine::new(store.clone()),
            store,
            sink,
            acks,
            options,
            projects: Mutex::new(AHashMap::new()),
        }
    }

    /// Reconcile against a full watch-list; projects missing from it are removed
    pub async fn apply_watch_list(&self, list: WatchList) {
        let wanted: Vec<String> = list.projects.iter().map(|c| c.project_id.clone()).collect();

        for stale in self.project_ids().into_iter().filter(|id| !wanted.contains(id)) {
            info!("Project {} is no longer in the watch-list", stale);
            self.remove(&stale).await;
        }

        for config in list.projects {
            self.upsert(config).await;
        }

        match self.store.retain(&wanted) {
            Ok(0) => {}
            Ok(n) => debug!("Dropped {} stale snapshots", n),
            Err(e) => warn!("Failed to prune snapshots: {:#}", e),
        }
    }

    /// Apply the records of one `watchChanged` push
    pub async fn apply_changes(&self, changes: Vec<ProjectChange>) {
        for change in changes {
            match change {
                ProjectChange::Add(config) | ProjectChange::Update(config) => self.upsert(config).await,
                ProjectChange::Delete { project_id } => {
                    if !self.remove(&project_id).await {
                        debug!("Delete for unknown project {}", project_id);
                    }
                }
            }
        }
    }

    /// Start or update a project
    ///
    /// A malformed configuration is rejected with a failed ack and the
    /// project keeps its previous state. A new root restarts the project
    /// from a fresh snapshot.
    pub async fn upsert(&self, config: ProjectWatchConfig) {
        let settings = match ProjectSettings::from_config(&config) {
            Ok(settings) => Arc::new(settings),
            Err(e) => {
                error!("Rejecting watch configuration for {}: {}", config.project_id, e);
                self.ack(&config, false);
                return;
            }
        };

        let transition = {
            let projects = self.projects.lock();
            match projects.get(&config.project_id) {
                None => Transition::Start,
                Some(current) if current.config.root() != settings.root => Transition::Restart,
                Some(current)
                    if current.config.same_watch_settings(&config)
                        && current.config.watch_state_id == config.watch_state_id =>
                {
                    Transition::Unchanged
                }
                Some(_) => Transition::Update,
            }
        };

        match transition {
            Transition::Unchanged => return,
            Transition::Start => self.start(config.clone(), settings),
            Transition::Restart => {
                info!("Root of {} changed to {}, restarting", config.project_id, settings.root);
                self.remove(&config.project_id).await;
                self.start(config.clone(), settings);
            }
            Transition::Update => {
                let mut projects = self.projects.lock();
                if let Some(current) = projects.get_mut(&config.project_id) {
                    if current.settings.send(settings).is_err() {
                        warn!("Reconciler for {} has exited", config.project_id);
                    }
                    current.config = config.clone();
                }
                info!("Updated watch settings for {}", config.project_id);
            }
        }

        self.ack(&config, true);
    }

    /// Stop a project and forget its snapshot; false if it was not watched
    pub async fn remove(&self, project_id: &str) -> bool {
        let removed = self.projects.lock().remove(project_id);
        let Some(project) = removed else {
            return false;
        };

        project.task.abort();
        let _ = project.task.await;

        if let Err(e) = self.store.remove(project_id) {
            warn!("Failed to remove snapshot for {}: {:#}", project_id, e);
        }
        info!("Stopped watching {}", project_id);
        true
    }

    /// Stop every task, keeping snapshots for the next run
    pub async fn shutdown(&self) {
        let projects: Vec<_> = self.projects.lock().drain().collect();
        for (_, project) in projects {
            project.task.abort();
            let _ = project.task.await;
        }
    }

    pub fn project_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.projects.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Configuration a project is currently running with
    pub fn config(&self, project_id: &str) -> Option<ProjectWatchConfig> {
        self.projects.lock().get(project_id).map(|p| p.config.clone())
    }

    pub fn len(&self) -> usize {
        self.projects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.lock().is_empty()
    }

    fn start(&self, config: ProjectWatchConfig, settings: Arc<ProjectSettings>) {
        let (settings_tx, settings_rx) = watch::channel(settings);
        let reconciler =
            ProjectReconciler::new(self.engine.clone(), settings_rx, self.sink.clone(), self.options.clone());
        let task = tokio::spawn(reconciler.run());

        let project_id = config.project_id.clone();
        let previous = self.projects.lock().insert(
            project_id.clone(),
            WatchedProject {
                config,
                settings: settings_tx,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.task.abort();
        }
        info!("Started watching {}", project_id);
    }

    fn ack(&self, config: &ProjectWatchConfig, success: bool) {
        if config.watch_state_id.is_empty() {
            debug!("No watch state id to acknowledge for {}", config.project_id);
            return;
        }
        self.acks.send_ack(WatchAck {
            project_id: config.project_id.clone(),
            watch_state_id: config.watch_state_id.clone(),
            success,
        });
    }
}
