//! Report data types
//!
//! Results of a scan or an advice run, ready to be exported

use serde::{Deserialize, Serialize};

use crate::deprecation::{DependencyStatus, ScanSummary};
use crate::risk::AdvisorSummary;

/// Deprecation scan of one dependency set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub generated_at: String,
    pub source: String,
    pub statuses: Vec<DependencyStatus>,
    pub summary: ScanSummary,
    /// History row id when the scan was stored
    pub scan_id: Option<i64>,
}

/// Scan plus upgrade advice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorReport {
    pub generated_at: String,
    pub source: String,
    pub statuses: Vec<DependencyStatus>,
    pub summary: ScanSummary,
    pub advice: AdvisorSummary,
    /// Python files inspected for imports, when a project was scanned
    pub files_scanned: Option<usize>,
    pub offline: bool,
    pub scan_id: Option<i64>,
}

impl AdvisorReport {
    /// The deprecation part of the report
    pub fn scan(&self) -> ScanReport {
        ScanReport {
            generated_at: self.generated_at.clone(),
            source: self.source.clone(),
            statuses: self.statuses.clone(),
            summary: self.summary,
            scan_id: self.scan_id,
        }
    }
}
