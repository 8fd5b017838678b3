//! Per-project filesystem snapshots
//!
//! This crate provides:
//! - Snapshot records (project-relative entries, watermark, last batch timestamp)
//! - A sled-backed store, one key per project

pub mod store;

// Re-exports
pub use store::{Snapshot, SnapshotEntry, SnapshotStore};

/// Result type for snapshot operations
pub type Result<T> = anyhow::Result<T>;
