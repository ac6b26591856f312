//! CSV export functionality
//!
//! Provides CSV serialization with one row per package.

use std::collections::HashMap;

use csv::WriterBuilder;

use super::ExportablePackage;
use crate::models::report::{AdvisorReport, ScanReport};
use crate::risk::RiskAssessment;
use crate::CommandError;

/// Column order of `ExportablePackage`
const HEADER: [&str; 11] = [
    "name",
    "version",
    "state",
    "reason",
    "warnings",
    "target_version",
    "upgrade_kind",
    "risk_score",
    "risk_level",
    "action",
    "breaking_changes",
];

fn write_rows(rows: &[ExportablePackage]) -> Result<String, CommandError> {
    // Header written up front so an empty report is still a valid table
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .map_err(|e| CommandError::Internal(format!("Failed to write CSV header: {}", e)))?;

    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| CommandError::Internal(format!("Failed to write CSV record: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CommandError::Internal(format!("Failed to flush CSV: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| CommandError::Internal(format!("CSV output is not UTF-8: {}", e)))
}

/// One row per scanned package
pub fn render_scan_csv(report: &ScanReport) -> Result<String, CommandError> {
    let rows: Vec<ExportablePackage> = report
        .statuses
        .iter()
        .map(|status| ExportablePackage::new(status, None))
        .collect();
    write_rows(&rows)
}

/// One row per package with its assessment columns filled in
pub fn render_advice_csv(report: &AdvisorReport) -> Result<String, CommandError> {
    let by_name: HashMap<&str, &RiskAssessment> = report
        .advice
        .assessments
        .iter()
        .map(|a| (a.name.as_str(), a))
        .collect();

    let rows: Vec<ExportablePackage> = report
        .statuses
        .iter()
        .map(|status| ExportablePackage::new(status, by_name.get(status.name.as_str()).copied()))
        .collect();
    write_rows(&rows)
}
