//! Glob-style ignore filtering
//!
//! Two independent rule sets: whole-path rules and per-segment filename rules.
//! The only wildcard is `*`, which matches any run of characters (including `/`).
//! Filtering is blacklist-only, so an empty filter excludes nothing.

use crate::{Error, Result};
use regex::Regex;
use tracing::warn;

/// Compiled ignore rules for one project configuration
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    /// Rules matched against the entire canonical path
    path_rules: Vec<Regex>,

    /// Rules matched against each path segment
    filename_rules: Vec<Regex>,
}

impl PathFilter {
    /// Compile rules from a watch configuration
    ///
    /// Filename rules must not contain separators and path rules must not
    /// contain `\`.
    pub fn new(ignored_paths: &[String], ignored_filenames: &[String]) -> Result<Self> {
        let mut path_rules = Vec::with_capacity(ignored_paths.len());
        for rule in ignored_paths {
            if rule.contains('\\') {
                return Err(Error::InvalidFilter {
                    rule: rule.clone(),
                    reason: "path rules must use '/' separators".to_string(),
                });
            }
            path_rules.push(compile_glob(rule)?);
        }

        let mut filename_rules = Vec::with_capacity(ignored_filenames.len());
        for rule in ignored_filenames {
            if rule.contains('/') || rule.contains('\\') {
                return Err(Error::InvalidFilter {
                    rule: rule.clone(),
                    reason: "filename rules must not contain path separators".to_string(),
                });
            }
            filename_rules.push(compile_glob(rule)?);
        }

        Ok(Self {
            path_rules,
            filename_rules,
        })
    }

    /// A filter that excludes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.path_rules.is_empty() && self.filename_rules.is_empty()
    }

    /// True if any path rule matches the whole path
    pub fn is_filtered_out_by_path(&self, path: &str) -> bool {
        if self.path_rules.is_empty() {
            return false;
        }
        if path.contains('\\') {
            warn!("Refusing to filter non-canonical path: {}", path);
            return false;
        }
        self.path_rules.iter().any(|rule| rule.is_match(path))
    }

    /// True if any filename rule matches any single segment of the path
    pub fn is_filtered_out_by_filename(&self, path: &str) -> bool {
        if self.filename_rules.is_empty() {
            return false;
        }
        if path.contains('\\') {
            warn!("Refusing to filter non-canonical path: {}", path);
            return false;
        }
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .any(|segment| self.filename_rules.iter().any(|rule| rule.is_match(segment)))
    }

    /// True if either rule set excludes the path
    pub fn is_filtered_out(&self, path: &str) -> bool {
        self.is_filtered_out_by_path(path) || self.is_filtered_out_by_filename(path)
    }
}

/// Translate a `*`-glob into an anchored regex with every other character literal
fn compile_glob(rule: &str) -> Result<Regex> {
    let body = rule
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{}$", body)).map_err(|e| Error::InvalidFilter {
        rule: rule.to_string(),
        reason: e.to_string(),
    })
}
