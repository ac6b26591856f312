//! Dependency data types
//!
//! Types representing pinned Python packages

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A pinned dependency (`name==version`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    /// Create a new dependency record
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

/// Normalize a project name the way package indexes do
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;

    for c in name.trim().chars() {
        if c == '-' || c == '_' || c == '.' {
            if !last_was_sep {
                out.push('-');
            }
            last_was_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_was_sep = false;
        }
    }

    out
}

/// Where a dependency list came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum DependencySource {
    /// Live `pip freeze` output of the active environment
    PipFreeze,
    /// A freeze or requirements file on disk
    File(PathBuf),
}

impl DependencySource {
    /// Short label used in reports and the history table
    pub fn label(&self) -> String {
        match self {
            Self::PipFreeze => "pip freeze".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}
