//! Filesystem walk producing snapshot entries
//!
//! Entries that vanish between readdir and stat are left out, so the next
//! comparison turns them into DELETE events. Entries that exist but cannot be
//! read are reported in `unreadable` instead.

use anyhow::Result;
use fwatch_core::path;
use fwatch_core::{CanonicalPath, RefPath};
use snapshot::SnapshotEntry;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

/// Everything one walk of a project saw
#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    /// Project-relative entries, root excluded
    pub entries: Vec<SnapshotEntry>,

    /// Whether the project root existed when the walk began
    pub root_exists: bool,

    /// Project-relative paths whose contents could not be read
    pub unreadable: Vec<CanonicalPath>,
}

/// Walk a project root and its refPaths
///
/// Blocking; run on a blocking thread from async code.
pub fn walk_project(root: &Path, ref_paths: &[RefPath]) -> Result<WalkResult> {
    let mut result = WalkResult {
        root_exists: root.is_dir(),
        ..Default::default()
    };

    if result.root_exists {
        walk_root(root, &mut result);
    } else {
        debug!("Project root {} does not exist", root.display());
    }

    for ref_path in ref_paths {
        if let Some(entry) = resolve_ref_path(ref_path)? {
            result.entries.push(entry);
        }
    }

    Ok(result)
}

fn walk_root(root: &Path, result: &mut WalkResult) {
    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if is_vanished(e.io_error()) {
                    debug!("Entry vanished during walk: {}", e);
                } else {
                    warn!("Skipping unreadable entry: {}", e);
                    result.unreadable.push(relative_path(root, e.path().unwrap_or(root)));
                }
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                if is_vanished(e.io_error()) {
                    debug!("Entry vanished before stat: {}", e);
                } else {
                    warn!("Could not stat {}: {}", entry.path().display(), e);
                    result.unreadable.push(relative_path(root, entry.path()));
                }
                continue;
            }
        };

        result.entries.push(SnapshotEntry::new(
            relative_path(root, entry.path()),
            metadata.is_dir(),
            mod_time_millis(&metadata),
        ));
    }
}

fn is_vanished(error: Option<&io::Error>) -> bool {
    error.map(|e| e.kind()) == Some(io::ErrorKind::NotFound)
}

/// Project-relative form of a path under `root` (the root itself maps to `/`)
fn relative_path(root: &Path, path: &Path) -> CanonicalPath {
    match path.strip_prefix(root) {
        Ok(relative) => CanonicalPath::root().join(&relative.to_string_lossy()),
        Err(_) => CanonicalPath::root(),
    }
}

/// Stat one refPath source and place it at its project-relative target
fn resolve_ref_path(ref_path: &RefPath) -> Result<Option<SnapshotEntry>> {
    let source = path::to_local(&ref_path.source())?;

    match std::fs::metadata(&source) {
        Ok(metadata) if metadata.is_dir() => {
            error!("refPath source must be a file, not a directory: {}", source.display());
            Ok(None)
        }
        Ok(metadata) => Ok(Some(SnapshotEntry::new(
            ref_path.target(),
            false,
            mod_time_millis(&metadata),
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => {
            warn!("Could not stat refPath source {}: {}", source.display(), e);
            Ok(None)
        }
    }
}

/// Modification time in Unix milliseconds (0 if the platform cannot tell)
pub fn mod_time_millis(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
