//! Core types for fwatch
//!
//! This crate provides the pieces shared by the producer and consumer sides:
//! - Canonical path normalization across OS path conventions
//! - Glob-style ignore filtering
//! - Change events, batches and watch configuration records
//! - Contiguous-duplicate event collapsing
//! - The compressed wire encoding for event batches

pub mod error;
pub mod path;
pub mod filter;
pub mod event;
pub mod model;
pub mod dedup;
pub mod codec;

// Re-export main types for convenience
pub use error::Error;
pub use path::{CanonicalPath, PROJECT_ROOT_PATH};
pub use filter::PathFilter;
pub use event::{ChangeBatch, ChangeEvent, EventType};
pub use model::{
    FileChangeMessage, ProjectChange, ProjectWatchConfig, PushMessage, RefPath, WatchAck,
    WatchList, WatchStatusBody,
};

/// Result type used throughout fwatch-core
pub type Result<T> = std::result::Result<T, Error>;

/// Current wall-clock time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
