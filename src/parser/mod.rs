//! Dependency list parsing module
//!
//! This module handles reading pinned Python dependencies:
//! - `pip freeze` output
//! - requirements files (specifiers, markers, extras)
//! - PEP 440 version parsing and ordering

pub mod freeze;
pub mod requirements;
pub mod version;

use thiserror::Error;

pub use freeze::parse_pip_freeze;
pub use requirements::{find_requirement_files, parse_requirements, Requirement};
pub use version::{UpgradeKind, Version, VersionError};

/// Parser errors
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid requirement on line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// Result type for parser operations
pub type ParserResult<T> = Result<T, ParserError>;
