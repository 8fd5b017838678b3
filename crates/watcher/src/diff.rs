//! Snapshot diffing
//!
//! Compares a fresh walk with the project's previous snapshot:
//! - DELETE: previous paths missing from the walk, plus the root itself when it disappears
//! - MODIFY: entries newer than the watermark whose mtime differs from the previous one
//! - CREATE: entries newer than the watermark that did not exist before
//!
//! The first cycle for a project only seeds the snapshot. Previous entries
//! under a subtree the walk could not read are carried over unchanged.

use crate::walk::{walk_project, WalkResult};
use anyhow::{Context, Result};
use fwatch_core::dedup::change_summary;
use fwatch_core::path;
use fwatch_core::{
    now_millis, CanonicalPath, ChangeBatch, ChangeEvent, EventType, PathFilter, ProjectWatchConfig, RefPath,
    PROJECT_ROOT_PATH,
};
use snapshot::{Snapshot, SnapshotStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Validated diff configuration for one project
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub project_id: String,

    /// Canonical project root
    pub root: CanonicalPath,

    /// Compiled ignore rules
    pub filter: PathFilter,

    pub ref_paths: Vec<RefPath>,
}

impl ProjectSettings {
    /// Validate a watch configuration and compile its filter
    pub fn from_config(config: &ProjectWatchConfig) -> fwatch_core::Result<Self> {
        config.validate()?;
        Ok(Self {
            project_id: config.project_id.clone(),
            root: config.root(),
            filter: config.filter()?,
            ref_paths: config.ref_paths.clone(),
        })
    }
}

/// Result of comparing a walk with the previous snapshot
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// Filtered events, all stamped with `batch_timestamp_millis`
    pub events: Vec<ChangeEvent>,

    /// Meaningful only when `events` is non-empty
    pub batch_timestamp_millis: i64,

    /// Replacement snapshot
    pub snapshot: Snapshot,
}

/// Pure comparison step of a diff cycle
///
/// `walk_started_millis` becomes the new watermark so that edits made while
/// walking are picked up by the next cycle.
pub fn diff(
    previous: Option<&Snapshot>,
    root: &CanonicalPath,
    walk: WalkResult,
    walk_started_millis: i64,
    now: i64,
    filter: &PathFilter,
) -> DiffOutcome {
    let unreadable = walk.unreadable;
    let mut snapshot = Snapshot::new(root, walk.entries, walk_started_millis, walk.root_exists);

    let previous = match previous {
        Some(previous) => previous,
        None => {
            return DiffOutcome {
                events: Vec::new(),
                batch_timestamp_millis: 0,
                snapshot,
            }
        }
    };

    if !unreadable.is_empty() {
        for entry in previous.entries.values() {
            if unreadable.iter().any(|dir| dir.covers(&entry.path)) {
                snapshot
                    .entries
                    .entry(entry.path.clone())
                    .or_insert_with(|| entry.clone());
            }
        }
    }

    let mut created = Vec::new();
    let mut modified = Vec::new();
    for entry in snapshot.entries.values() {
        if entry.mod_time_millis <= previous.watermark_millis {
            continue;
        }
        match previous.get(&entry.path) {
            // Already reported by the walk that recorded this mtime
            Some(seen) if seen.mod_time_millis == entry.mod_time_millis => {}
            Some(_) => modified.push((entry.path.clone(), entry.is_directory, EventType::Modify)),
            None => created.push((entry.path.clone(), entry.is_directory, EventType::Create)),
        }
    }

    let mut deleted: Vec<_> = previous
        .entries
        .values()
        .filter(|entry| !snapshot.contains(&entry.path))
        .map(|entry| (entry.path.clone(), entry.is_directory, EventType::Delete))
        .collect();

    if previous.root_exists && !snapshot.root_exists {
        deleted.push((CanonicalPath::new(PROJECT_ROOT_PATH), true, EventType::Delete));
    }

    let batch_timestamp_millis = now.max(previous.last_batch_timestamp_millis + 1);

    let events: Vec<ChangeEvent> = created
        .into_iter()
        .chain(modified)
        .chain(deleted)
        .filter(|(path, _, _)| !filter.is_filtered_out(path.as_str()))
        .map(|(path, is_directory, event_type)| {
            ChangeEvent::new(path, is_directory, event_type, batch_timestamp_millis)
        })
        .collect();

    snapshot.last_batch_timestamp_millis = if events.is_empty() {
        previous.last_batch_timestamp_millis
    } else {
        batch_timestamp_millis
    };

    DiffOutcome {
        events,
        batch_timestamp_millis,
        snapshot,
    }
}

/// Runs diff cycles against the snapshot store
#[derive(Clone)]
pub struct DiffEngine {
    store: Arc<SnapshotStore>,
}

impl DiffEngine {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    /// Walk the project, diff against the stored snapshot, and replace it
    ///
    /// The snapshot is replaced even when the returned batch is never delivered.
    pub async fn cycle(&self, settings: &ProjectSettings) -> Result<Option<ChangeBatch>> {
        let project_id = &settings.project_id;
        let walk_started = now_millis();

        let local_root = path::to_local(&settings.root)?;
        let ref_paths = settings.ref_paths.clone();
        let walk = tokio::task::spawn_blocking(move || walk_project(&local_root, &ref_paths))
            .await
            .context("Walk task panicked")??;

        // A snapshot taken under a different root says nothing about this one
        let previous = self
            .store
            .previous(project_id)?
            .filter(|snapshot| snapshot.root == settings.root.as_str());

        let outcome = diff(
            previous.as_ref(),
            &settings.root,
            walk,
            walk_started,
            now_millis(),
            &settings.filter,
        );

        self.store
            .replace(project_id, &outcome.snapshot)
            .with_context(|| format!("Failed to store snapshot for {}", project_id))?;

        if previous.is_none() {
            info!("Seeded snapshot for {} ({} entries)", project_id, outcome.snapshot.len());
            return Ok(None);
        }

        if outcome.events.is_empty() {
            debug!("No changes for {}", project_id);
            return Ok(None);
        }

        info!(
            "Batch change summary for {}@{}: {}",
            project_id,
            outcome.batch_timestamp_millis,
            change_summary(&outcome.events)
        );

        Ok(Some(ChangeBatch::new(
            project_id.clone(),
            outcome.batch_timestamp_millis,
            outcome.events,
        )))
    }
}
