//! Scan history data types
//!
//! Types for scans persisted to the history database

use serde::{Deserialize, Serialize};

/// A stored scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub created_at: String,
    pub source: String,
    pub total: u32,
    pub deprecated: u32,
    pub warnings: u32,
    pub healthy: u32,
}

/// Per-package row of a stored scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanPackageRecord {
    pub scan_id: i64,
    pub name: String,
    pub version: String,
    pub state: String,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
    pub target_version: Option<String>,
    pub risk_level: Option<String>,
    pub risk_score: Option<f64>,
}

/// Difference between two stored scans
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanDiff {
    pub older_scan_id: i64,
    pub newer_scan_id: i64,
    /// Packages deprecated now that were not before
    pub newly_deprecated: Vec<String>,
    /// Packages that were deprecated and no longer are
    pub resolved: Vec<String>,
    /// Packages whose version changed: (name, old, new)
    pub version_changes: Vec<(String, String, String)>,
    /// Packages only present in the newer scan
    pub added: Vec<String>,
    /// Packages only present in the older scan
    pub removed: Vec<String>,
}

impl ScanDiff {
    /// True when nothing changed between the scans
    pub fn is_empty(&self) -> bool {
        self.newly_deprecated.is_empty()
            && self.resolved.is_empty()
            && self.version_changes.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}
