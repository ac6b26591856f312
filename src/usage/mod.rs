//! Project usage module
//!
//! Finds which installed distributions a Python project actually imports,
//! and which of their symbols it touches.

pub mod imports;
pub mod scan;

use thiserror::Error;

pub use imports::{import_names_for, parse_imports, Import};
pub use scan::{scan_project, ModuleUsage, ProjectUsage, UsageReport};

/// Directories never descended into
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".venv",
    "venv",
    "env",
    "site-packages",
    ".git",
    "node_modules",
    "__pycache__",
    ".tox",
    "build",
    "dist",
];

/// Usage scan errors
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Not a directory: {0}")]
    NotADirectory(String),
}
