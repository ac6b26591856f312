//! Package index module
//!
//! Looks up release metadata on a PyPI-compatible JSON API:
//! - Latest stable and pre-release versions
//! - Yanked releases
//! - Project links (changelog), classifiers and long description

pub mod client;
pub mod types;

use thiserror::Error;

pub use client::RegistryClient;
pub use types::ReleaseInfo;

/// Default PyPI JSON API endpoint
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// Registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Package not found on index: {0}")]
    NotFound(String),

    #[error("Index returned status {status} for {name}")]
    Status { name: String, status: u16 },

    #[error("Invalid index response: {0}")]
    InvalidResponse(String),

    #[error("Lookup task failed: {0}")]
    Task(String),
}
