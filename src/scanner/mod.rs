//! Environment scanner module
//!
//! Talks to pip to list, install, remove and upgrade packages
//! in the active Python environment.

pub mod pip;

use thiserror::Error;

pub use pip::{PipRunner, UpdateAllOutcome};

/// Pip invocation errors
#[derive(Error, Debug)]
pub enum PipError {
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error executing '{command}': {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Invalid package specification: {0}")]
    InvalidSpec(String),
}
