//! Change events and batches
//!
//! A `ChangeEvent` serializes directly into the wire record
//! `{path, directory, type, timestamp}`.

use crate::CanonicalPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Create,
    Modify,
    Delete,
}

impl EventType {
    /// Single-character marker used in change summaries
    pub fn marker(&self) -> char {
        match self {
            EventType::Create => '+',
            EventType::Modify => '>',
            EventType::Delete => '-',
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Create => "CREATE",
            EventType::Modify => "MODIFY",
            EventType::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One detected change to a project-relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Project-relative canonical path
    pub path: CanonicalPath,

    /// For DELETE this is the last known type
    #[serde(rename = "directory")]
    pub is_directory: bool,

    #[serde(rename = "type")]
    pub event_type: EventType,

    #[serde(rename = "timestamp")]
    pub timestamp_millis: i64,
}

impl ChangeEvent {
    pub fn new(path: CanonicalPath, is_directory: bool, event_type: EventType, timestamp_millis: i64) -> Self {
        Self {
            path,
            is_directory,
            event_type,
            timestamp_millis,
        }
    }

    pub fn create(path: CanonicalPath, is_directory: bool, timestamp_millis: i64) -> Self {
        Self::new(path, is_directory, EventType::Create, timestamp_millis)
    }

    pub fn modify(path: CanonicalPath, is_directory: bool, timestamp_millis: i64) -> Self {
        Self::new(path, is_directory, EventType::Modify, timestamp_millis)
    }

    pub fn delete(path: CanonicalPath, is_directory: bool, timestamp_millis: i64) -> Self {
        Self::new(path, is_directory, EventType::Delete, timestamp_millis)
    }
}

/// One delivery unit: the events of a diff cycle sharing a batch timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub project_id: String,

    /// Strictly increasing per project for one producer instance
    pub batch_timestamp_millis: i64,

    /// Events in creation order
    pub events: Vec<ChangeEvent>,
}

impl ChangeBatch {
    pub fn new(project_id: impl Into<String>, batch_timestamp_millis: i64, events: Vec<ChangeEvent>) -> Self {
        Self {
            project_id: project_id.into(),
            batch_timestamp_millis,
            events,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
