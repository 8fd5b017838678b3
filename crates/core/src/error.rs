//! Error types for fwatch-core

use thiserror::Error;

/// Errors raised at the core boundary
#[derive(Debug, Error)]
pub enum Error {
    /// A path could not be converted between canonical and native form
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// An ignore rule was rejected
    #[error("invalid filter rule '{rule}': {reason}")]
    InvalidFilter { rule: String, reason: String },

    /// A watch configuration failed validation
    #[error("malformed watch configuration for project '{project_id}': {reason}")]
    MalformedConfig { project_id: String, reason: String },

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression failed
    #[error("compression error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload was not valid base64
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl Error {
    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}
