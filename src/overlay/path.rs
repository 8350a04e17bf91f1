//! Site-relative logical paths.

use crate::error::{GenFilesError, Result};
use serde::Serialize;
use std::{
    borrow::Borrow,
    fmt,
    path::{Component, Path, PathBuf},
};

/// Forward-slash normalized, site-relative path such as `reference/api.md`.
///
/// Never empty, never absolute, and never contains `.` or `..` components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LogicalPath(String);

impl LogicalPath {
    /// Normalize a user supplied path.
    ///
    /// | Input | Result |
    /// |-------|--------|
    /// | `a/./b.md` | `a/b.md` |
    /// | `a\b.md` | `a/b.md` |
    /// | `a/../b.md` | `b.md` |
    /// | `../b.md` | `PathEscape` |
    /// | `/etc/passwd` | `PathEscape` |
    /// | `./` | `EmptyPath` |
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.starts_with(['/', '\\']) || has_drive_prefix(raw) {
            return Err(GenFilesError::PathEscape(raw.to_owned()));
        }

        let mut parts: Vec<&str> = Vec::new();
        for part in raw.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(GenFilesError::PathEscape(raw.to_owned()));
                    }
                }
                part => parts.push(part),
            }
        }

        if parts.is_empty() {
            return Err(GenFilesError::EmptyPath);
        }
        Ok(Self(parts.join("/")))
    }

    /// Build a logical path from a path relative to the docs directory.
    pub fn from_relative(path: &Path) -> Result<Self> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy()),
                Component::CurDir => {}
                _ => return Err(GenFilesError::PathEscape(path.display().to_string())),
            }
        }
        Self::parse(&parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Physical location of this path below `root`.
    pub fn to_physical(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
    }
}

/// `C:foo` and `C:\foo` style prefixes.
fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LogicalPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LogicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
