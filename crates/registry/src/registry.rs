//! Consumer-side watch registry
//!
//! Per project: `Unregistered → PendingAck → Watching`.
//! - Registration generates a watch state id and enters PendingAck
//! - Any filter or refPath change generates a new id and returns to PendingAck
//! - Only a successful ack for the current id moves the project to Watching
//! - Unregistering clears the project's ack state
//!
//! Every change is pushed to connected producer sessions.

use crate::error::{ProtocolViolation, ViolationFlags};
use crate::sessions::SessionHub;
use crate::sink::DeliveredBatch;
use ahash::AHashMap;
use fwatch_core::{ProjectChange, ProjectWatchConfig, PushMessage, WatchAck, WatchList};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Acknowledgement state of a registered project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatchState {
    PendingAck,
    Watching,
}

/// Body of the watch status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStatus {
    pub state: WatchState,

    #[serde(rename = "projectWatchStateId")]
    pub watch_state_id: String,
}

/// What an ack did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The project moved to (or stayed in) Watching
    Applied,
    /// The producer could not apply the current configuration
    Refused,
    /// The ack named a superseded watch state
    Stale,
    UnknownProject,
}

#[derive(Debug, Clone)]
pub(crate) struct RegisteredProject {
    pub(crate) config: ProjectWatchConfig,
    pub(crate) state: WatchState,
}

/// State shared by the registry and the delivery sink, behind one mutex
#[derive(Default)]
pub(crate) struct Ledger {
    pub(crate) projects: AHashMap<String, RegisteredProject>,

    /// (project id, watch state id) → first acked value
    pub(crate) acks: AHashMap<(String, String), bool>,

    /// Highest accepted batch timestamp per project
    pub(crate) highest_timestamps: AHashMap<String, i64>,

    /// Accepted batches, oldest first
    pub(crate) delivered: VecDeque<DeliveredBatch>,

    pub(crate) flags: ViolationFlags,
}

pub(crate) type SharedLedger = Arc<Mutex<Ledger>>;

fn new_watch_state_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct WatchRegistry {
    ledger: SharedLedger,
    sessions: Arc<SessionHub>,
}

impl WatchRegistry {
    pub(crate) fn new(ledger: SharedLedger, sessions: Arc<SessionHub>) -> Self {
        Self { ledger, sessions }
    }

    /// Register or update a project
    ///
    /// The incoming watch state id is ignored. Identical settings keep the
    /// current id and state and push nothing.
    pub fn register(&self, mut config: ProjectWatchConfig) -> fwatch_core::Result<ProjectWatchConfig> {
        config.validate()?;
        config.local_root = config.root().to_string();

        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;

        let change = match ledger.projects.get_mut(&config.project_id) {
            Some(existing) if existing.config.same_watch_settings(&config) => {
                config.watch_state_id = existing.config.watch_state_id.clone();
                existing.config = config.clone();
                debug!("Project {} re-registered with unchanged settings", config.project_id);
                return Ok(config);
            }
            Some(existing) => {
                config.watch_state_id = new_watch_state_id();
                existing.config = config.clone();
                existing.state = WatchState::PendingAck;
                ledger.acks.retain(|(id, _), _| id != &config.project_id);
                info!(
                    "Updated watch for {} (watch state {})",
                    config.project_id, config.watch_state_id
                );
                ProjectChange::Update(config.clone())
            }
            None => {
                config.watch_state_id = new_watch_state_id();
                ledger.projects.insert(
                    config.project_id.clone(),
                    RegisteredProject {
                        config: config.clone(),
                        state: WatchState::PendingAck,
                    },
                );
                info!(
                    "Registered watch for {} at {} (watch state {})",
                    config.project_id, config.local_root, config.watch_state_id
                );
                ProjectChange::Add(config.clone())
            }
        };

        self.sessions.broadcast(&PushMessage::WatchChanged {
            projects: vec![change],
        });
        Ok(config)
    }

    /// Stop watching a project; false if it was not registered
    pub fn unregister(&self, project_id: &str) -> bool {
        let mut ledger = self.ledger.lock();
        if ledger.projects.remove(project_id).is_none() {
            return false;
        }
        ledger.acks.retain(|(id, _), _| id != project_id);
        ledger.highest_timestamps.remove(project_id);

        info!("Unregistered watch for {}", project_id);
        self.sessions.broadcast(&PushMessage::WatchChanged {
            projects: vec![ProjectChange::Delete {
                project_id: project_id.to_string(),
            }],
        });
        true
    }

    /// Record a producer's ack
    ///
    /// Answering the same (project, watch state) pair both ways is a violation.
    pub fn acknowledge(&self, ack: &WatchAck) -> Result<AckOutcome, ProtocolViolation> {
        let mut guard = self.ledger.lock();
        let ledger = &mut *guard;

        let Some(project) = ledger.projects.get_mut(&ack.project_id) else {
            debug!("Ignoring ack for unknown project {}", ack.project_id);
            return Ok(AckOutcome::UnknownProject);
        };

        let key = (ack.project_id.clone(), ack.watch_state_id.clone());
        if let Some(&previous) = ledger.acks.get(&key) {
            if previous != ack.success {
                let violation = ProtocolViolation::AckFlip {
                    project_id: ack.project_id.clone(),
                    watch_state_id: ack.watch_state_id.clone(),
                    success: ack.success,
                };
                ledger.flags.latch(&violation);
                error!("SEVERE: {}", violation);
                return Err(violation);
            }
        }
        if project.config.watch_state_id != ack.watch_state_id {
            debug!(
                "Ignoring stale ack for {} (watch state {})",
                ack.project_id, ack.watch_state_id
            );
            return Ok(AckOutcome::Stale);
        }
        // Only the current watch state is remembered
        ledger.acks.insert(key, ack.success);

        if ack.success {
            if project.state != WatchState::Watching {
                info!("Project {} is now watching ({})", ack.project_id, ack.watch_state_id);
            }
            project.state = WatchState::Watching;
            Ok(AckOutcome::Applied)
        } else {
            warn!(
                "Producer could not apply watch state {} for {}",
                ack.watch_state_id, ack.project_id
            );
            Ok(AckOutcome::Refused)
        }
    }

    pub fn status(&self, project_id: &str) -> Option<WatchStatus> {
        self.ledger.lock().projects.get(project_id).map(|p| WatchStatus {
            state: p.state,
            watch_state_id: p.config.watch_state_id.clone(),
        })
    }

    pub fn config(&self, project_id: &str) -> Option<ProjectWatchConfig> {
        self.ledger.lock().projects.get(project_id).map(|p| p.config.clone())
    }

    /// Full watch-list, ordered by project id
    pub fn watch_list(&self) -> WatchList {
        let mut projects: Vec<_> = self
            .ledger
            .lock()
            .projects
            .values()
            .map(|p| p.config.clone())
            .collect();
        projects.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        WatchList { projects }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwatch_core::Error;

    fn registry() -> (WatchRegistry, Arc<SessionHub>) {
        let sessions = Arc::new(SessionHub::new());
        (
            WatchRegistry::new(Arc::new(Mutex::new(Ledger::default())), sessions.clone()),
            sessions,
        )
    }

    fn config(paths: &[&str]) -> ProjectWatchConfig {
        ProjectWatchConfig::new("p1", "/home/me/p1").with_ignored_paths(paths.iter().map(|s| s.to_string()).collect())
    }

    fn ack(watch_state_id: &str, success: bool) -> WatchAck {
        WatchAck {
            project_id: "p1".to_string(),
            watch_state_id: watch_state_id.to_string(),
            success,
        }
    }

    #[test]
    fn test_register_then_ack_moves_to_watching() {
        let (registry, _) = registry();
        let registered = registry.register(config(&[])).unwrap();
        assert!(!registered.watch_state_id.is_empty());
        assert_eq!(registry.status("p1").unwrap().state, WatchState::PendingAck);

        let outcome = registry.acknowledge(&ack(&registered.watch_state_id, true)).unwrap();
        assert_eq!(outcome, AckOutcome::Applied);
        assert_eq!(registry.status("p1").unwrap().state, WatchState::Watching);
    }

    #[test]
    fn test_filter_change_regenerates_id_and_ignores_stale_ack() {
        let (registry, _) = registry();
        let first = registry.register(config(&["/a/*"])).unwrap();
        registry.acknowledge(&ack(&first.watch_state_id, true)).unwrap();

        let second = registry.register(config(&["/a/*", "/target/*"])).unwrap();
        assert_ne!(first.watch_state_id, second.watch_state_id);
        assert_eq!(registry.status("p1").unwrap().state, WatchState::PendingAck);

        // Ack for the superseded id must not move the project to Watching
        let outcome = registry.acknowledge(&ack(&first.watch_state_id, true)).unwrap();
        assert_eq!(outcome, AckOutcome::Stale);
        assert_eq!(registry.status("p1").unwrap().state, WatchState::PendingAck);

        registry.acknowledge(&ack(&second.watch_state_id, true)).unwrap();
        assert_eq!(registry.status("p1").unwrap().state, WatchState::Watching);
    }

    #[test]
    fn test_superseded_acks_are_forgotten() {
        let (registry, _) = registry();
        let mut current = registry.register(config(&[])).unwrap();
        for i in 0..5 {
            registry.acknowledge(&ack(&current.watch_state_id, true)).unwrap();
            let pattern = format!("/gen{}/*", i);
            current = registry.register(config(&[pattern.as_str()])).unwrap();
        }
        registry.acknowledge(&ack(&current.watch_state_id, true)).unwrap();

        let acks = registry.ledger.lock().acks.clone();
        assert_eq!(acks.len(), 1);
        assert!(acks.contains_key(&("p1".to_string(), current.watch_state_id.clone())));
    }

    #[test]
    fn test_identical_registration_keeps_state_and_pushes_nothing() {
        let (registry, sessions) = registry();
        let first = registry.register(config(&["/a/*", "/b/*"])).unwrap();
        registry.acknowledge(&ack(&first.watch_state_id, true)).unwrap();

        let (_, mut rx) = sessions.register();
        let again = registry.register(config(&["/b/*", "/a/*"])).unwrap();
        assert_eq!(again.watch_state_id, first.watch_state_id);
        assert_eq!(registry.status("p1").unwrap().state, WatchState::Watching);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ack_flip_is_a_violation() {
        let (registry, _) = registry();
        let registered = registry.register(config(&[])).unwrap();
        registry.acknowledge(&ack(&registered.watch_state_id, true)).unwrap();
        registry.acknowledge(&ack(&registered.watch_state_id, true)).unwrap();

        let result = registry.acknowledge(&ack(&registered.watch_state_id, false));
        assert!(matches!(result, Err(ProtocolViolation::AckFlip { .. })));
        assert!(registry.ledger.lock().flags.has_ack_flip);
        assert_eq!(registry.status("p1").unwrap().state, WatchState::Watching);
    }

    #[test]
    fn test_failed_ack_keeps_pending() {
        let (registry, _) = registry();
        let registered = registry.register(config(&[])).unwrap();
        let outcome = registry.acknowledge(&ack(&registered.watch_state_id, false)).unwrap();
        assert_eq!(outcome, AckOutcome::Refused);
        assert_eq!(registry.status("p1").unwrap().state, WatchState::PendingAck);
    }

    #[test]
    fn test_unregister_pushes_delete_and_clears_acks() {
        let (registry, sessions) = registry();
        let registered = registry.register(config(&[])).unwrap();
        registry.acknowledge(&ack(&registered.watch_state_id, true)).unwrap();

        let (_, mut rx) = sessions.register();
        assert!(registry.unregister("p1"));
        assert!(!registry.unregister("p1"));
        assert!(registry.status("p1").is_none());
        assert!(registry.ledger.lock().acks.is_empty());

        let pushed: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            pushed,
            serde_json::json!({
                "type": "watchChanged",
                "projects": [{"changeType": "delete", "projectID": "p1"}]
            })
        );

        assert_eq!(
            registry.acknowledge(&ack(&registered.watch_state_id, false)).unwrap(),
            AckOutcome::UnknownProject
        );
    }

    #[test]
    fn test_malformed_registration_keeps_previous_state() {
        let (registry, _) = registry();
        let registered = registry.register(config(&["/a/*"])).unwrap();

        let bad = ProjectWatchConfig::new("p1", "relative/path");
        assert!(matches!(registry.register(bad), Err(Error::MalformedConfig { .. })));
        assert_eq!(registry.config("p1").unwrap().watch_state_id, registered.watch_state_id);
    }

    #[test]
    fn test_add_push_and_watch_list() {
        let (registry, sessions) = registry();
        let (_, mut rx) = sessions.register();

        let mut drive_config = ProjectWatchConfig::new("p0", "/C/work");
        drive_config.ignored_filenames = vec!["*.class".to_string()];
        registry.register(drive_config).unwrap();
        registry.register(config(&[])).unwrap();

        let pushed: PushMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        match pushed {
            PushMessage::WatchChanged { projects } => {
                assert!(matches!(&projects[0], ProjectChange::Add(c) if c.local_root == "/c/work"));
            }
            other => panic!("unexpected push: {:?}", other),
        }

        let ids: Vec<_> = registry.watch_list().projects.into_iter().map(|c| c.project_id).collect();
        assert_eq!(ids, vec!["p0".to_string(), "p1".to_string()]);
    }
}
