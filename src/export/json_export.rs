//! JSON export functionality
//!
//! Provides JSON serialization for scan and advice reports
//! with full structure preservation.

use serde::Serialize;

use crate::deprecation::{DependencyStatus, ScanSummary};
use crate::models::report::{AdvisorReport, ScanReport};
use crate::risk::AdvisorSummary;
use crate::CommandError;

/// Scan export structure
#[derive(Debug, Clone, Serialize)]
pub struct ScanExportJson<'a> {
    pub export_date: String,
    pub export_version: &'static str,
    pub generated_at: &'a str,
    pub source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<i64>,
    pub summary: ScanSummary,
    pub packages: &'a [DependencyStatus],
}

/// Advice export structure
#[derive(Debug, Clone, Serialize)]
pub struct AdviceExportJson<'a> {
    pub export_date: String,
    pub export_version: &'static str,
    pub generated_at: &'a str,
    pub source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<i64>,
    pub offline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_scanned: Option<usize>,
    pub summary: ScanSummary,
    pub packages: &'a [DependencyStatus],
    pub advice: &'a AdvisorSummary,
}

const EXPORT_VERSION: &str = "1.0.0";

fn to_json<T: Serialize>(value: &T) -> Result<String, CommandError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CommandError::Internal(format!("Failed to serialize JSON: {}", e)))
}

/// Render a scan report as pretty JSON
pub fn render_scan_json(report: &ScanReport) -> Result<String, CommandError> {
    to_json(&ScanExportJson {
        export_date: chrono::Utc::now().to_rfc3339(),
        export_version: EXPORT_VERSION,
        generated_at: &report.generated_at,
        source: &report.source,
        scan_id: report.scan_id,
        summary: report.summary,
        packages: &report.statuses,
    })
}

/// Render an advice report as pretty JSON
pub fn render_advice_json(report: &AdvisorReport) -> Result<String, CommandError> {
    to_json(&AdviceExportJson {
        export_date: chrono::Utc::now().to_rfc3339(),
        export_version: EXPORT_VERSION,
        generated_at: &report.generated_at,
        source: &report.source,
        scan_id: report.scan_id,
        offline: report.offline,
        files_scanned: report.files_scanned,
        summary: report.summary,
        packages: &report.statuses,
        advice: &report.advice,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deprecation::{check_deprecation_status, summarize, DeprecationRules};
    use crate::models::dependency::Dependency;

    #[test]
    fn test_scan_json_envelope() {
        let statuses = check_deprecation_status(
            &[Dependency::new("Django", "2.2"), Dependency::new("rich", "13.0.0")],
            &DeprecationRules::default(),
        );
        let report = ScanReport {
            generated_at: "2024-01-01T00:00:00Z".to_string(),
            source: "requirements.txt".to_string(),
            summary: summarize(&statuses),
            statuses,
            scan_id: Some(7),
        };

        let json = render_scan_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["export_version"], "1.0.0");
        assert!(value["export_date"].is_string());
        assert_eq!(value["scan_id"], 7);
        assert_eq!(value["summary"]["deprecated"], 1);
        assert_eq!(value["packages"][0]["name"], "django");
        assert_eq!(value["packages"][0]["is_deprecated"], true);
        assert_eq!(value["packages"][1]["warnings"].as_array().map(|a| a.len()), Some(0));
    }

    #[test]
    fn test_advice_json_contains_assessments() {
        let report = AdvisorReport {
            generated_at: "2024-01-01T00:00:00Z".to_string(),
            source: "pip freeze".to_string(),
            statuses: Vec::new(),
            summary: ScanSummary::default(),
            advice: AdvisorSummary::from_assessments(Vec::new()),
            files_scanned: None,
            offline: true,
            scan_id: None,
        };

        let json = render_advice_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["offline"], true);
        assert!(value.get("files_scanned").is_none());
        assert!(value["advice"]["assessments"].as_array().unwrap().is_empty());
    }
}
