//! Deprecation detection logic
//!
//! Implements the per-package checks against a `DeprecationRules` table.

use std::cmp::Ordering;

use crate::models::dependency::Dependency;
use crate::parser::version::{compare_release, parse_strict_release};

use super::types::{DependencyStatus, DeprecationRules, FindingType, ScanSummary};

/// Check deprecation status of dependencies
///
/// Returns one status per input dependency, in input order.
pub fn check_deprecation_status(
    dependencies: &[Dependency],
    rules: &DeprecationRules,
) -> Vec<DependencyStatus> {
    dependencies
        .iter()
        .map(|dep| check_dependency(dep, rules))
        .collect()
}

/// Count deprecated, warning and healthy packages
pub fn summarize(statuses: &[DependencyStatus]) -> ScanSummary {
    ScanSummary::from_statuses(statuses)
}

/// Check a single dependency
pub fn check_dependency(dep: &Dependency, rules: &DeprecationRules) -> DependencyStatus {
    let name = dep.name.to_lowercase();
    let current_version = dep.version.clone();
    let mut status = DependencyStatus::new(name.clone(), current_version.clone());

    // Known packages with a minimum supported version
    if let Some(min_supported) = rules.minimum_version(&name) {
        match (
            parse_strict_release(&current_version),
            parse_strict_release(min_supported),
        ) {
            (Some(current), Some(minimum)) => {
                if compare_release(&current, &minimum) == Ordering::Less {
                    status.mark_deprecated(
                        FindingType::BelowMinimumVersion,
                        format!(
                            "Version {} is deprecated. Minimum supported version: {}",
                            current_version, min_supported
                        ),
                    );
                }
            }
            _ => {
                status.add_warning(
                    FindingType::UnparseableVersion,
                    format!("Version {} cannot be parsed", current_version),
                );
            }
        }
    }

    // Alpha/beta/pre-release builds
    let lowered = current_version.to_lowercase();
    if rules
        .prerelease_keywords
        .iter()
        .any(|keyword| lowered.contains(keyword.as_str()))
    {
        status.add_warning(
            FindingType::PreRelease,
            "This is a development/pre-release version".to_string(),
        );
    }

    // Package names that announce their own deprecation
    if rules
        .name_keywords
        .iter()
        .any(|keyword| name.contains(keyword.as_str()))
    {
        status.mark_deprecated(
            FindingType::DeprecatedName,
            "Package name indicates deprecated status".to_string(),
        );
    }

    tracing::debug!(
        package = %status.name,
        version = %status.current_version,
        state = status.state().as_str(),
        "checked deprecation status"
    );

    status
}
