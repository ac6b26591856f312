//! Deprecation check types
//!
//! Defines the kinds of findings, the per-package status record and the
//! rule table used by the detector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kinds of findings the detector can raise for a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    /// Installed version is older than the minimum supported version
    BelowMinimumVersion,
    /// Tracked package whose version is not plain dotted integers
    UnparseableVersion,
    /// alpha / beta / rc / dev / pre build
    PreRelease,
    /// Name contains "deprecated" or "legacy"
    DeprecatedName,
}

/// Overall health of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Ok,
    Warning,
    Deprecated,
}

impl HealthState {
    /// Get lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Deprecated => "deprecated",
        }
    }

    /// Label used in the text report
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Deprecated => "DEPRECATED",
        }
    }
}

/// Deprecation status of a single package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Lower-cased package name
    pub name: String,
    /// Version exactly as pinned
    pub current_version: String,
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
    pub has_warnings: bool,
    pub warnings: Vec<String>,
    /// Every finding raised, in detection order
    #[serde(default)]
    pub findings: Vec<FindingType>,
}

impl DependencyStatus {
    /// Create a clean status for a package
    pub fn new(name: String, current_version: String) -> Self {
        Self {
            name,
            current_version,
            is_deprecated: false,
            deprecation_reason: None,
            has_warnings: false,
            warnings: Vec::new(),
            findings: Vec::new(),
        }
    }

    /// Mark as deprecated, replacing any earlier reason
    pub fn mark_deprecated(&mut self, finding: FindingType, reason: String) {
        self.is_deprecated = true;
        self.deprecation_reason = Some(reason);
        self.findings.push(finding);
    }

    /// Attach a warning
    pub fn add_warning(&mut self, finding: FindingType, warning: String) {
        self.has_warnings = true;
        self.warnings.push(warning);
        self.findings.push(finding);
    }

    /// Derived health; deprecation wins over warnings
    pub fn state(&self) -> HealthState {
        if self.is_deprecated {
            HealthState::Deprecated
        } else if self.has_warnings {
            HealthState::Warning
        } else {
            HealthState::Ok
        }
    }
}

/// Counts for a completed scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: u32,
    pub deprecated: u32,
    pub warnings: u32,
    pub healthy: u32,
}

impl ScanSummary {
    /// Summarize a list of statuses
    ///
    /// A deprecated package with warnings is only counted as deprecated, so
    /// `healthy = total - deprecated - warnings` always holds.
    pub fn from_statuses(statuses: &[DependencyStatus]) -> Self {
        let mut summary = Self {
            total: statuses.len() as u32,
            ..Self::default()
        };

        for status in statuses {
            match status.state() {
                HealthState::Deprecated => summary.deprecated += 1,
                HealthState::Warning => summary.warnings += 1,
                HealthState::Ok => {}
            }
        }

        summary.healthy = summary.total - summary.deprecated - summary.warnings;
        summary
    }
}

lazy_static::lazy_static! {
    /// Known packages and the oldest release still considered supported
    static ref DEFAULT_MINIMUM_VERSIONS: Vec<(&'static str, &'static str)> = vec![
        ("requests", "2.0.0"),
        ("django", "3.0.0"),
        ("flask", "2.0.0"),
        ("numpy", "1.20.0"),
        ("tensorflow", "2.0.0"),
        ("pandas", "1.0.0"),
        ("matplotlib", "3.0.0"),
        ("scikit-learn", "0.22.0"),
        ("fastapi", "0.68.0"),
        ("pytorch", "1.8.0"),
        ("scipy", "1.6.0"),
        ("pillow", "8.0.0"),
        ("sqlalchemy", "1.4.0"),
        ("beautifulsoup4", "4.9.0"),
        ("selenium", "4.0.0"),
        ("pytest", "6.0.0"),
        ("jupyter", "1.0.0"),
        ("notebook", "6.0.0"),
        ("ipython", "7.0.0"),
        ("aiohttp", "3.7.0"),
        ("tornado", "6.1.0"),
        ("celery", "5.0.0"),
        ("redis", "3.5.0"),
        ("psycopg2", "2.8.0"),
        ("pymongo", "3.11.0"),
        ("sqlite3", "3.35.0"),
        ("pygame", "2.0.0"),
        ("opencv-python", "4.5.0"),
        ("tqdm", "4.60.0"),
        ("loguru", "0.5.0"),
        ("rich", "9.0.0"),
        ("click", "8.0.0"),
        ("typer", "0.3.0"),
        ("pydantic", "1.8.0"),
        ("marshmallow", "3.12.0"),
        ("gunicorn", "20.1.0"),
        ("uvicorn", "0.13.0"),
        ("django-rest-framework", "3.12.0"),
        ("flask-restful", "0.3.9"),
        ("graphene", "3.0.0"),
        ("plotly", "5.0.0"),
        ("seaborn", "0.11.0"),
        ("bokeh", "2.4.0"),
        ("streamlit", "1.0.0"),
        ("dash", "2.0.0"),
        ("airflow", "2.2.0"),
        ("prefect", "0.15.0"),
        ("luigi", "3.0.0"),
        ("mlflow", "1.23.0"),
        ("transformers", "4.15.0"),
        ("spacy", "3.2.0"),
        ("nltk", "3.6.0"),
        ("gensim", "4.1.0"),
        ("elasticsearch", "7.15.0"),
        ("kafka-python", "2.0.0"),
        ("boto3", "1.20.0"),
        ("azure-storage-blob", "12.9.0"),
        ("google-cloud-storage", "2.0.0"),
        ("twisted", "22.0.0"),
        ("asyncio", "3.4.0"),
        ("virtualenv", "20.10.0"),
        ("pipenv", "2022.0.0"),
        ("poetry", "1.2.0"),
    ];
}

/// Rule table for the deprecation detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeprecationRules {
    /// Lower-cased package name -> minimum supported version
    pub minimum_versions: BTreeMap<String, String>,
    /// Substrings of the lower-cased version marking a pre-release
    pub prerelease_keywords: Vec<String>,
    /// Substrings of the lower-cased name marking a deprecated package
    pub name_keywords: Vec<String>,
}

impl Default for DeprecationRules {
    fn default() -> Self {
        Self {
            minimum_versions: DEFAULT_MINIMUM_VERSIONS
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect(),
            prerelease_keywords: ["alpha", "beta", "rc", "dev", "pre"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            name_keywords: ["deprecated", "legacy"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DeprecationRules {
    /// Add or replace minimum versions; names are lower-cased
    pub fn with_minimum_versions<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, version) in entries {
            self.minimum_versions
                .insert(name.as_ref().to_lowercase(), version.into());
        }
        self
    }

    /// Replace the name keywords when a non-empty list is given
    pub fn with_name_keywords(mut self, keywords: &[String]) -> Self {
        if !keywords.is_empty() {
            self.name_keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        }
        self
    }

    /// Minimum supported version for a lower-cased name
    pub fn minimum_version(&self, name: &str) -> Option<&str> {
        self.minimum_versions.get(name).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_state_strings() {
        assert_eq!(HealthState::Deprecated.label(), "DEPRECATED");
        assert_eq!(HealthState::Ok.as_str(), "ok");
    }

    #[test]
    fn test_status_state_precedence() {
        let mut status = DependencyStatus::new("pkg".to_string(), "1.0rc1".to_string());
        assert_eq!(status.state(), HealthState::Ok);

        status.add_warning(FindingType::PreRelease, "pre".to_string());
        assert_eq!(status.state(), HealthState::Warning);

        status.mark_deprecated(FindingType::DeprecatedName, "name".to_string());
        assert_eq!(status.state(), HealthState::Deprecated);
        assert_eq!(status.findings.len(), 2);
    }

    #[test]
    fn test_summary_counts() {
        let ok = DependencyStatus::new("a".to_string(), "1.0".to_string());
        let mut warn = DependencyStatus::new("b".to_string(), "1.0b1".to_string());
        warn.add_warning(FindingType::PreRelease, "w".to_string());
        let mut both = DependencyStatus::new("c".to_string(), "0.1rc1".to_string());
        both.add_warning(FindingType::PreRelease, "w".to_string());
        both.mark_deprecated(FindingType::DeprecatedName, "d".to_string());

        let summary = ScanSummary::from_statuses(&[ok, warn, both]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.deprecated, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.healthy, 1);
    }

    #[test]
    fn test_default_rules() {
        let rules = DeprecationRules::default();
        assert_eq!(rules.minimum_versions.len(), 63);
        assert_eq!(rules.minimum_version("numpy"), Some("1.20.0"));
        assert_eq!(rules.minimum_version("pipenv"), Some("2022.0.0"));
        assert_eq!(rules.prerelease_keywords, vec!["alpha", "beta", "rc", "dev", "pre"]);
        assert_eq!(rules.name_keywords, vec!["deprecated", "legacy"]);
    }

    #[test]
    fn test_rule_overrides() {
        let rules = DeprecationRules::default()
            .with_minimum_versions(vec![("NumPy", "1.24.0"), ("httpx", "0.24.0")])
            .with_name_keywords(&["abandoned".to_string()]);

        assert_eq!(rules.minimum_version("numpy"), Some("1.24.0"));
        assert_eq!(rules.minimum_version("httpx"), Some("0.24.0"));
        assert_eq!(rules.name_keywords, vec!["abandoned"]);
    }

    #[test]
    fn test_status_serialization() {
        let mut status = DependencyStatus::new("django".to_string(), "2.2.0".to_string());
        status.mark_deprecated(FindingType::BelowMinimumVersion, "old".to_string());

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"is_deprecated\":true"));
        assert!(json.contains("\"findings\":[\"below_minimum_version\"]"));
    }
}
