//! Canonical path representation
//!
//! Every path that crosses a component or process boundary is carried in one
//! canonical form:
//! - `/` separators only
//! - drive-letter paths become `/<lowercase letter>/...` (`C:\Users` -> `/c/Users`)
//! - no trailing slash, except for the root `/`
//!
//! Normalization is idempotent.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Project-relative path reported when the project root itself disappears
pub const PROJECT_ROOT_PATH: &str = "/";

/// A path in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Normalize a native path into canonical form
    pub fn new(native: &str) -> Self {
        normalize(native)
    }

    /// The root path `/`
    pub fn root() -> Self {
        Self(PROJECT_ROOT_PATH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == PROJECT_ROOT_PATH
    }

    /// Non-empty segments of the path, in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last segment of the path (empty for the root)
    pub fn file_name(&self) -> &str {
        self.segments().last().unwrap_or("")
    }

    /// Whether `other` is this path or lies beneath it
    pub fn covers(&self, other: &CanonicalPath) -> bool {
        if self.is_root() {
            return true;
        }
        match other.as_str().strip_prefix(self.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Append a relative path, producing a canonical result
    pub fn join(&self, relative: &str) -> Self {
        let relative = relative.replace('\\', "/");
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            return self.clone();
        }
        if self.is_root() {
            normalize(&format!("/{}", relative))
        } else {
            normalize(&format!("{}/{}", self.0, relative))
        }
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CanonicalPath {
    fn from(value: String) -> Self {
        normalize(&value)
    }
}

impl From<CanonicalPath> for String {
    fn from(value: CanonicalPath) -> Self {
        value.0
    }
}

impl PartialEq<&str> for CanonicalPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Check for a `<letter>:` prefix
pub fn is_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Convert a native absolute path into canonical form
///
/// `C:\Users\me` -> `/c/Users/me`, `/C/tmp/` -> `/c/tmp`, `/home/me/` -> `/home/me`.
/// Paths without a drive letter only get separator normalization.
pub fn normalize(native: &str) -> CanonicalPath {
    let mut path = native.replace('\\', "/");

    if is_windows_absolute(&path) {
        let drive = path.as_bytes()[0].to_ascii_lowercase() as char;
        path = format!("/{}{}", drive, &path[2..]);
    }

    if let Some(drive) = uppercase_drive_segment(&path) {
        path.replace_range(1..2, &drive.to_ascii_lowercase().to_string());
    }

    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    CanonicalPath(path)
}

/// Returns the drive letter of a leading `/<LETTER>` or `/<LETTER>/` segment
fn uppercase_drive_segment(path: &str) -> Option<char> {
    let bytes = path.as_bytes();
    let is_drive = bytes.len() >= 2
        && bytes[0] == b'/'
        && bytes[1].is_ascii_uppercase()
        && (bytes.len() == 2 || bytes[2] == b'/');
    is_drive.then(|| bytes[1] as char)
}

/// Convert a canonical path back into a native path
///
/// For Windows targets `/c` becomes `c:\` and `/c/users` becomes `c:\users`.
/// Other targets get the canonical string unchanged.
pub fn denormalize(canonical: &str, target_is_windows: bool) -> Result<String> {
    if !canonical.starts_with('/') {
        return Err(Error::invalid_path(canonical, "path must begin with '/'"));
    }

    if !target_is_windows {
        return Ok(canonical.to_string());
    }

    let bytes = canonical.as_bytes();
    if bytes.len() < 2 {
        return Err(Error::invalid_path(
            canonical,
            "drive-style path needs at least 2 characters",
        ));
    }

    let drive = bytes[1] as char;
    if !drive.is_ascii_alphabetic() {
        return Err(Error::invalid_path(canonical, "missing drive letter"));
    }

    if bytes.len() == 2 {
        return Ok(format!("{}:\\", drive));
    }

    if bytes[2] != b'/' {
        return Err(Error::invalid_path(canonical, "drive letter must be followed by '/'"));
    }

    Ok(format!("{}:\\{}", drive, canonical[3..].replace('/', "\\")))
}

/// Convert a canonical path into a path on the host platform
pub fn to_local(canonical: &CanonicalPath) -> Result<PathBuf> {
    denormalize(canonical.as_str(), cfg!(windows)).map(PathBuf::from)
}

/// Strip `root` from `absolute`, on a segment boundary
///
/// `/home/me/project/src/a.rs` under `/home/me/project` -> `/src/a.rs`.
/// Returns `None` for the root itself and for paths outside the root.
pub fn to_project_relative(absolute: &CanonicalPath, root: &CanonicalPath) -> Option<CanonicalPath> {
    if root.is_root() {
        return (!absolute.is_root()).then(|| absolute.clone());
    }

    let rest = absolute.as_str().strip_prefix(root.as_str())?;
    if rest.starts_with('/') && rest.len() > 1 {
        Some(CanonicalPath(rest.to_string()))
    } else {
        None
    }
}
