//! Snapshot store using sled

use crate::Result;
use anyhow::Context;
use fwatch_core::CanonicalPath;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// One filesystem object as last seen by a diff cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Project-relative canonical path
    pub path: CanonicalPath,
    pub is_directory: bool,
    pub mod_time_millis: i64,
}

impl SnapshotEntry {
    pub fn new(path: CanonicalPath, is_directory: bool, mod_time_millis: i64) -> Self {
        Self {
            path,
            is_directory,
            mod_time_millis,
        }
    }
}

/// Full result of one diff cycle for a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Canonical project root the entries were walked from
    pub root: String,

    /// Entries keyed by project-relative path
    pub entries: BTreeMap<CanonicalPath, SnapshotEntry>,

    /// Start time of the walk that produced this snapshot
    pub watermark_millis: i64,

    /// Timestamp of the last batch emitted for the project (0 if none)
    pub last_batch_timestamp_millis: i64,

    /// Whether the project root existed during the walk
    pub root_exists: bool,
}

impl Snapshot {
    pub fn new(root: &CanonicalPath, entries: Vec<SnapshotEntry>, watermark_millis: i64, root_exists: bool) -> Self {
        Self {
            root: root.to_string(),
            entries: entries.into_iter().map(|e| (e.path.clone(), e)).collect(),
            watermark_millis,
            last_batch_timestamp_millis: 0,
            root_exists,
        }
    }

    pub fn contains(&self, path: &CanonicalPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &CanonicalPath) -> Option<&SnapshotEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn deserialize(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Persistent snapshots, keyed by project id
///
/// Each project's snapshot is read and replaced only by that project's
/// diff cycle, so no cross-project locking is needed.
pub struct SnapshotStore {
    /// Sled database (kept open for the store's lifetime)
    db: Db,
    /// Tree holding one bincode snapshot per project
    snapshots: Tree,
}

impl SnapshotStore {
    /// Open or create a store in the given state directory
    pub fn open(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir)
            .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;
        let db = sled::open(state_dir.join("snapshots.db"))
            .with_context(|| format!("Failed to open snapshot database in {}", state_dir.display()))?;
        Self::from_db(db)
    }

    /// Open a store that lives only as long as the process
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let snapshots = db.open_tree("snapshots")?;
        Ok(Self { db, snapshots })
    }

    /// Snapshot from the previous diff cycle, if any
    pub fn previous(&self, project_id: &str) -> Result<Option<Snapshot>> {
        match self.snapshots.get(project_id.as_bytes())? {
            Some(bytes) => Ok(Some(Snapshot::deserialize(&bytes).with_context(|| {
                format!("Corrupt snapshot for project {}", project_id)
            })?)),
            None => Ok(None),
        }
    }

    /// Replace the project's snapshot wholesale
    pub fn replace(&self, project_id: &str, snapshot: &Snapshot) -> Result<()> {
        let value = snapshot.serialize()?;
        self.snapshots.insert(project_id.as_bytes(), value)?;
        self.db.flush()?;
        debug!("Stored snapshot for {} ({} entries)", project_id, snapshot.len());
        Ok(())
    }

    /// Forget a project
    pub fn remove(&self, project_id: &str) -> Result<()> {
        self.snapshots.remove(project_id.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    /// Ids of all projects with a stored snapshot
    pub fn project_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for key in self.snapshots.iter().keys() {
            ids.push(String::from_utf8_lossy(&key?).into_owned());
        }
        Ok(ids)
    }

    /// Drop snapshots of projects that are no longer watched
    pub fn retain(&self, keep: &[String]) -> Result<usize> {
        let mut removed = 0;
        for id in self.project_ids()? {
            if !keep.contains(&id) {
                self.snapshots.remove(id.as_bytes())?;
                removed += 1;
            }
        }
        if removed > 0 {
            self.db.flush()?;
        }
        Ok(removed)
    }
}
