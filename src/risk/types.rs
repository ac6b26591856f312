//! Risk assessment types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::changelog::BreakingChange;
use crate::deprecation::DependencyStatus;
use crate::parser::version::UpgradeKind;
use crate::registry::ReleaseInfo;
use crate::usage::UsageReport;

/// Risk bucket for an upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a score in `0.0..=1.0`
    pub fn from_score(score: f64) -> Self {
        if score < 0.25 {
            Self::Low
        } else if score < 0.5 {
            Self::Medium
        } else if score < 0.75 {
            Self::High
        } else {
            Self::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Recommended next step for a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Installed version is deprecated or yanked; upgrade soon
    Urgent,
    /// Package is abandoned or renamed; look for a successor
    Replace,
    /// Upgrade is likely to break something
    ManualReview,
    /// Read the release notes before upgrading
    ReviewChangelog,
    /// Upgrade can be applied directly
    SafeUpgrade,
    /// No index data; check by hand
    LookupFailed,
    /// Nothing newer is available
    UpToDate,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Urgent => "Upgrade urgently",
            Self::Replace => "Replace package",
            Self::ManualReview => "Manual review",
            Self::ReviewChangelog => "Review changelog",
            Self::SafeUpgrade => "Safe upgrade",
            Self::LookupFailed => "Lookup failed",
            Self::UpToDate => "Up to date",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Replace => "replace",
            Self::ManualReview => "manual_review",
            Self::ReviewChangelog => "review_changelog",
            Self::SafeUpgrade => "safe_upgrade",
            Self::LookupFailed => "lookup_failed",
            Self::UpToDate => "up_to_date",
        }
    }

    /// Sort weight (higher = more pressing)
    pub fn priority(&self) -> u8 {
        match self {
            Self::Urgent => 6,
            Self::Replace => 5,
            Self::ManualReview => 4,
            Self::ReviewChangelog => 3,
            Self::SafeUpgrade => 2,
            Self::LookupFailed => 1,
            Self::UpToDate => 0,
        }
    }
}

/// Scoring weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    /// Added per breaking changelog entry
    pub breaking_weight: f64,
    /// Upper bound for the breaking-entry contribution
    pub breaking_cap: f64,
    /// Added when a breaking entry names a symbol the project uses
    pub symbol_weight: f64,
    /// Multiplier when the project never imports the package
    pub unused_factor: f64,
    /// Added for a major jump on a package marked inactive
    pub inactive_penalty: f64,
    /// Allow pre-releases as upgrade targets
    pub include_prereleases: bool,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            breaking_weight: 0.15,
            breaking_cap: 0.3,
            symbol_weight: 0.2,
            unused_factor: 0.5,
            inactive_penalty: 0.1,
            include_prereleases: false,
        }
    }
}

/// Everything known about one dependency
#[derive(Debug, Clone)]
pub struct RiskInput<'a> {
    pub status: &'a DependencyStatus,
    pub release: Option<&'a ReleaseInfo>,
    /// Breaking entries between the current and target versions
    pub breaking_changes: Vec<BreakingChange>,
    /// Whether release notes were available at all
    pub changelog_available: bool,
    pub usage: Option<&'a UsageReport>,
    /// Whether a project usage scan ran
    pub usage_scanned: bool,
    /// Why registry data is missing, if it is
    pub registry_error: Option<String>,
}

impl<'a> RiskInput<'a> {
    pub fn new(status: &'a DependencyStatus) -> Self {
        Self {
            status,
            release: None,
            breaking_changes: Vec::new(),
            changelog_available: false,
            usage: None,
            usage_scanned: false,
            registry_error: None,
        }
    }
}

/// Risk verdict for one dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub name: String,
    pub current_version: String,
    pub target_version: Option<String>,
    pub upgrade_kind: UpgradeKind,
    /// Combined risk in `0.0..=1.0`
    pub score: f64,
    pub level: RiskLevel,
    /// Human-readable reasons behind the score
    pub factors: Vec<String>,
    pub breaking_changes: Vec<BreakingChange>,
    pub action: Action,
    pub summary: String,
}

/// All assessments of a run, most pressing first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorSummary {
    pub assessments: Vec<RiskAssessment>,
    /// Assessments per risk level (`low`, `medium`, ...)
    pub level_counts: BTreeMap<String, u32>,
    /// Assessments per action (`urgent`, `safe_upgrade`, ...)
    pub action_counts: BTreeMap<String, u32>,
    /// Packages with a newer target version
    pub upgradable: u32,
    pub top_priority: Option<RiskAssessment>,
}

impl AdvisorSummary {
    /// Sort by action priority, then score (highest first), and count
    pub fn from_assessments(mut assessments: Vec<RiskAssessment>) -> Self {
        assessments.sort_by(|a, b| {
            b.action
                .priority()
                .cmp(&a.action.priority())
                .then_with(|| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut level_counts = BTreeMap::new();
        let mut action_counts = BTreeMap::new();
        for assessment in &assessments {
            *level_counts.entry(assessment.level.as_str().to_string()).or_insert(0) += 1;
            *action_counts.entry(assessment.action.as_str().to_string()).or_insert(0) += 1;
        }

        let upgradable = assessments
            .iter()
            .filter(|a| a.target_version.is_some())
            .count() as u32;

        let top_priority = assessments
            .first()
            .filter(|a| a.action != Action::UpToDate)
            .cloned();

        Self {
            assessments,
            level_counts,
            action_counts,
            upgradable,
            top_priority,
        }
    }

    pub fn count_for(&self, action: Action) -> u32 {
        self.action_counts.get(action.as_str()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(name: &str, action: Action, score: f64) -> RiskAssessment {
        RiskAssessment {
            name: name.to_string(),
            current_version: "1.0".to_string(),
            target_version: if matches!(action, Action::UpToDate | Action::LookupFailed) {
                None
            } else {
                Some("2.0".to_string())
            },
            upgrade_kind: UpgradeKind::Major,
            score,
            level: RiskLevel::from_score(score),
            factors: Vec::new(),
            breaking_changes: Vec::new(),
            action,
            summary: String::new(),
        }
    }

    #[test]
    fn test_level_from_score() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.249), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.25), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.5), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.75), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_summary_sorting() {
        let summary = AdvisorSummary::from_assessments(vec![
            assessment("a", Action::SafeUpgrade, 0.1),
            assessment("b", Action::ManualReview, 0.6),
            assessment("c", Action::ManualReview, 0.9),
            assessment("d", Action::Urgent, 0.2),
            assessment("e", Action::UpToDate, 0.0),
            assessment("f", Action::LookupFailed, 0.0),
        ]);

        let order: Vec<&str> = summary.assessments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(order, vec!["d", "c", "b", "a", "f", "e"]);
        assert_eq!(summary.count_for(Action::ManualReview), 2);
        assert_eq!(summary.level_counts.get("critical"), Some(&1));
        assert_eq!(summary.upgradable, 4);
        assert_eq!(summary.top_priority.as_ref().map(|a| a.name.as_str()), Some("d"));
    }

    #[test]
    fn test_nothing_to_do_has_no_top_priority() {
        let summary = AdvisorSummary::from_assessments(vec![assessment("e", Action::UpToDate, 0.0)]);
        assert!(summary.top_priority.is_none());
    }
}
