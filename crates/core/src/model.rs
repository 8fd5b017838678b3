//! Watch configuration records and the messages exchanged over the config channel
//!
//! Field names follow the wire protocol (`projectID`, `pathToMonitor`, ...).
//! Empty filter lists are omitted from serialized records.

use crate::path::{self, CanonicalPath};
use crate::{Error, PathFilter, Result};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// Maps an external file into a project's logical tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefPath {
    /// Absolute native or canonical path of the external file
    pub from: String,

    /// Project-relative target
    pub to: String,
}

impl RefPath {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Canonical absolute source path
    pub fn source(&self) -> CanonicalPath {
        path::normalize(&self.from)
    }

    /// Project-relative canonical target, always with a leading `/`
    pub fn target(&self) -> CanonicalPath {
        if self.to.starts_with('/') {
            path::normalize(&self.to)
        } else {
            path::normalize(&format!("/{}", self.to))
        }
    }
}

/// Watch configuration for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWatchConfig {
    #[serde(rename = "projectID", default)]
    pub project_id: String,

    /// Canonical absolute root of the project
    #[serde(rename = "pathToMonitor", default)]
    pub local_root: String,

    #[serde(rename = "ignoredPaths", default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_paths: Vec<String>,

    #[serde(rename = "ignoredFilenames", default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_filenames: Vec<String>,

    #[serde(rename = "refPaths", default, skip_serializing_if = "Vec::is_empty")]
    pub ref_paths: Vec<RefPath>,

    /// Identifies the current filter generation; acked by the producer
    #[serde(rename = "projectWatchStateId", default, skip_serializing_if = "String::is_empty")]
    pub watch_state_id: String,

    #[serde(rename = "projectCreationTime", default, skip_serializing_if = "Option::is_none")]
    pub project_creation_time: Option<i64>,

    /// `"non-project"` marks an external directory
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ProjectWatchConfig {
    pub fn new(project_id: impl Into<String>, local_root: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            local_root: local_root.into(),
            ignored_paths: Vec::new(),
            ignored_filenames: Vec::new(),
            ref_paths: Vec::new(),
            watch_state_id: String::new(),
            project_creation_time: None,
            kind: None,
        }
    }

    pub fn with_ignored_paths(mut self, rules: Vec<String>) -> Self {
        self.ignored_paths = rules;
        self
    }

    pub fn with_ignored_filenames(mut self, rules: Vec<String>) -> Self {
        self.ignored_filenames = rules;
        self
    }

    pub fn with_ref_paths(mut self, ref_paths: Vec<RefPath>) -> Self {
        self.ref_paths = ref_paths;
        self
    }

    /// Check the record before it is accepted at a boundary
    ///
    /// The root must be a canonical absolute path and the filter rules must compile.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_empty() {
            return Err(self.malformed("missing project id"));
        }
        if !self.local_root.starts_with('/') {
            return Err(self.malformed("pathToMonitor must begin with '/'"));
        }
        if self.local_root.contains('\\') {
            return Err(self.malformed("pathToMonitor must not contain '\\'"));
        }
        if self.local_root.len() > 1 && self.local_root.ends_with('/') {
            return Err(self.malformed("pathToMonitor must not end with '/'"));
        }
        for ref_path in &self.ref_paths {
            if ref_path.from.is_empty() || ref_path.to.is_empty() {
                return Err(self.malformed("refPaths entries need both 'from' and 'to'"));
            }
            if ref_path.to.contains('\\') {
                return Err(self.malformed("refPaths 'to' must not contain '\\'"));
            }
        }
        self.filter().map(|_| ())
    }

    /// Canonical project root (drive letters lowercased)
    pub fn root(&self) -> CanonicalPath {
        path::normalize(&self.local_root)
    }

    /// Compile the ignore rules of this configuration
    pub fn filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.ignored_paths, &self.ignored_filenames)
    }

    /// True when both configurations watch the same root with the same rules
    ///
    /// Filter lists compare as sets, refPaths compare in order.
    pub fn same_watch_settings(&self, other: &ProjectWatchConfig) -> bool {
        fn as_set(rules: &[String]) -> AHashSet<&str> {
            rules.iter().map(String::as_str).collect()
        }

        self.root() == other.root()
            && as_set(&self.ignored_paths) == as_set(&other.ignored_paths)
            && as_set(&self.ignored_filenames) == as_set(&other.ignored_filenames)
            && self.ref_paths == other.ref_paths
    }

    fn malformed(&self, reason: &str) -> Error {
        Error::MalformedConfig {
            project_id: self.project_id.clone(),
            reason: reason.to_string(),
        }
    }
}

/// One entry of a `watchChanged` push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "changeType", rename_all = "lowercase")]
pub enum ProjectChange {
    Add(ProjectWatchConfig),
    Update(ProjectWatchConfig),
    /// Carries only the project id
    Delete {
        #[serde(rename = "projectID")]
        project_id: String,
    },
}

impl ProjectChange {
    pub fn project_id(&self) -> &str {
        match self {
            ProjectChange::Add(config) | ProjectChange::Update(config) => &config.project_id,
            ProjectChange::Delete { project_id } => project_id,
        }
    }
}

/// Messages pushed from the consumer to connected producers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushMessage {
    #[serde(rename = "watchChanged")]
    WatchChanged { projects: Vec<ProjectChange> },

    #[serde(rename = "debug")]
    Debug { msg: String },
}

/// Full watch-list returned by the GET endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchList {
    #[serde(default)]
    pub projects: Vec<ProjectWatchConfig>,
}

/// Acknowledgement of one watch-state generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchAck {
    pub project_id: String,
    pub watch_state_id: String,
    pub success: bool,
}

/// Body of the ack PUT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchStatusBody {
    pub success: bool,
}

/// Body of the file-changes POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeMessage {
    pub msg: String,
}
