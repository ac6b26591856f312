//! Export module for text, CSV and JSON reports
//!
//! Renders scan and advice reports and writes them to stdout or to
//! timestamped files.

pub mod csv_export;
pub mod json_export;
pub mod text;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::deprecation::DependencyStatus;
use crate::models::report::{AdvisorReport, ScanReport};
use crate::risk::RiskAssessment;
use crate::CommandError;

/// Export format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Text,
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(CommandError::Usage(format!(
                "Invalid export format: {}. Use 'text', 'csv' or 'json'",
                s
            ))),
        }
    }
}

impl ExportFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Flattened package row for CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportablePackage {
    pub name: String,
    pub version: String,
    pub state: String,
    pub reason: Option<String>,
    /// Warnings joined with "; "
    pub warnings: String,
    pub target_version: Option<String>,
    pub upgrade_kind: Option<String>,
    pub risk_score: Option<f64>,
    pub risk_level: Option<String>,
    pub action: Option<String>,
    pub breaking_changes: Option<usize>,
}

impl ExportablePackage {
    pub fn new(status: &DependencyStatus, assessment: Option<&RiskAssessment>) -> Self {
        Self {
            name: status.name.clone(),
            version: status.current_version.clone(),
            state: status.state().as_str().to_string(),
            reason: status.deprecation_reason.clone(),
            warnings: status.warnings.join("; "),
            target_version: assessment.and_then(|a| a.target_version.clone()),
            upgrade_kind: assessment.map(|a| a.upgrade_kind.label().to_string()),
            risk_score: assessment.map(|a| (a.score * 100.0).round() / 100.0),
            risk_level: assessment.map(|a| a.level.as_str().to_string()),
            action: assessment.map(|a| a.action.as_str().to_string()),
            breaking_changes: assessment.map(|a| a.breaking_changes.len()),
        }
    }
}

/// Render a scan report
pub fn render_scan(report: &ScanReport, format: ExportFormat) -> Result<String, CommandError> {
    match format {
        ExportFormat::Text => Ok(text::render_scan_text(report)),
        ExportFormat::Csv => csv_export::render_scan_csv(report),
        ExportFormat::Json => json_export::render_scan_json(report),
    }
}

/// Render an advice report
pub fn render_advice(report: &AdvisorReport, format: ExportFormat) -> Result<String, CommandError> {
    match format {
        ExportFormat::Text => Ok(text::render_advice_text(report)),
        ExportFormat::Csv => csv_export::render_advice_csv(report),
        ExportFormat::Json => json_export::render_advice_json(report),
    }
}

/// Generate a timestamped filename for exports
pub fn generate_export_filename(prefix: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", prefix, timestamp, extension)
}

/// Resolve where a report goes
///
/// A directory gets a timestamped file inside it; any other path is used
/// as-is.
pub fn resolve_output_path(output: &Path, prefix: &str, format: ExportFormat) -> PathBuf {
    if output.is_dir() {
        output.join(generate_export_filename(prefix, format.extension()))
    } else {
        output.to_path_buf()
    }
}

/// Write rendered content to a file, creating parent directories
pub fn write_export(content: &str, path: &Path) -> Result<(), CommandError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| CommandError::Internal(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, content)
        .map_err(|e| CommandError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deprecation::{check_dependency, DeprecationRules};
    use crate::models::dependency::Dependency;
    use tempfile::TempDir;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("Text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_export_format_extension() {
        assert_eq!(ExportFormat::Text.extension(), "txt");
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Json.extension(), "json");
    }

    #[test]
    fn test_export_format_serialization() {
        assert_eq!(serde_json::to_string(&ExportFormat::Csv).unwrap(), "\"csv\"");
        let text: ExportFormat = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(text, ExportFormat::Text);
    }

    #[test]
    fn test_generate_export_filename_format() {
        let filename = generate_export_filename("scan", "csv");

        // Should follow pattern: scan_YYYYMMDD_HHMMSS.csv
        assert!(filename.starts_with("scan_"));
        assert!(filename.ends_with(".csv"));
        assert_eq!(filename.len(), "scan_".len() + 15 + ".csv".len());
    }

    #[test]
    fn test_resolve_output_path() {
        let tmp = TempDir::new().unwrap();
        let in_dir = resolve_output_path(tmp.path(), "advice", ExportFormat::Json);
        assert_eq!(in_dir.parent(), Some(tmp.path()));
        assert!(in_dir.to_string_lossy().ends_with(".json"));

        let file = tmp.path().join("report.txt");
        assert_eq!(resolve_output_path(&file, "advice", ExportFormat::Json), file);
    }

    #[test]
    fn test_write_export_creates_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("scan.txt");
        write_export("hello", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_exportable_package_without_assessment() {
        let status = check_dependency(&Dependency::new("flask", "3.0.0rc1"), &DeprecationRules::default());
        let row = ExportablePackage::new(&status, None);

        assert_eq!(row.state, "warning");
        assert_eq!(
            row.warnings,
            "Version 3.0.0rc1 cannot be parsed; This is a development/pre-release version"
        );
        assert!(row.action.is_none());
    }
}
