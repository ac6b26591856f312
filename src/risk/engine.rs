//! Risk engine
//!
//! Turns deprecation status, index metadata, changelog findings and project
//! usage into a scored recommendation per package.

use crate::deprecation::FindingType;
use crate::parser::version::{UpgradeKind, Version};

use super::types::{Action, RiskAssessment, RiskInput, RiskLevel, RiskSettings};

/// Base score per kind of version jump
fn base_score(kind: UpgradeKind) -> f64 {
    match kind {
        UpgradeKind::None | UpgradeKind::Downgrade => 0.0,
        UpgradeKind::Patch => 0.05,
        UpgradeKind::Minor => 0.2,
        UpgradeKind::Major => 0.5,
        UpgradeKind::PreRelease => 0.6,
        UpgradeKind::Unknown => 0.4,
    }
}

/// Assess the upgrade risk of one dependency
pub fn assess(input: &RiskInput<'_>, settings: &RiskSettings) -> RiskAssessment {
    let status = input.status;
    let mut factors = Vec::new();

    let target = input
        .release
        .and_then(|r| r.target_version(settings.include_prereleases))
        .map(|t| t.to_string());

    let upgrade_kind = match &target {
        None => UpgradeKind::None,
        Some(target) => match (Version::parse(&status.current_version), Version::parse(target)) {
            (Ok(current), Ok(target)) => UpgradeKind::between(&current, &target),
            _ => UpgradeKind::Unknown,
        },
    };
    let target_version = target.filter(|_| upgrade_kind.is_upgrade());

    if let Some(ref error) = input.registry_error {
        factors.push(format!("Index lookup failed: {}", error));
    }
    if let Some(ref reason) = status.deprecation_reason {
        factors.push(reason.clone());
    }

    let mut score = base_score(upgrade_kind);
    if let Some(ref target) = target_version {
        factors.push(format!(
            "{} upgrade {} -> {}",
            capitalize(upgrade_kind.label()),
            status.current_version,
            target
        ));
        if let Some(behind) = input.release.and_then(|r| r.releases_behind(&status.current_version)) {
            if behind > 1 {
                factors.push(format!("{} releases behind", behind));
            }
        }
    }

    // Breaking changelog entries
    let breaking_count = input
        .breaking_changes
        .iter()
        .filter(|c| c.kind.is_breaking())
        .count();
    if breaking_count > 0 {
        score += (breaking_count as f64 * settings.breaking_weight).min(settings.breaking_cap);
        factors.push(format!(
            "{} breaking change{} in release notes",
            breaking_count,
            if breaking_count == 1 { "" } else { "s" }
        ));
    }
    let deprecation_count = input.breaking_changes.len() - breaking_count;
    if deprecation_count > 0 {
        factors.push(format!("{} deprecation notice(s) in release notes", deprecation_count));
    }
    if target_version.is_some() && !input.changelog_available {
        factors.push("No release notes available".to_string());
    }

    // Breaking entries naming symbols this project uses
    let mut touched: Vec<&str> = input
        .breaking_changes
        .iter()
        .filter(|c| c.kind.is_breaking())
        .flat_map(|c| c.matched_symbols.iter().map(|s| s.as_str()))
        .collect();
    touched.sort_unstable();
    touched.dedup();
    if !touched.is_empty() {
        score += settings.symbol_weight;
        factors.push(format!("Release notes mention used symbols: {}", touched.join(", ")));
    }

    let unused = input.usage_scanned && input.usage.is_none();
    if unused {
        score *= settings.unused_factor;
        factors.push("Not imported by the project".to_string());
    } else if let Some(usage) = input.usage {
        factors.push(format!(
            "Imported as `{}` in {} file{}",
            usage.import_name,
            usage.files.len(),
            if usage.files.len() == 1 { "" } else { "s" }
        ));
    }

    let inactive = input.release.map(|r| r.inactive).unwrap_or(false);
    if inactive {
        factors.push("Marked inactive upstream".to_string());
        if upgrade_kind == UpgradeKind::Major {
            score += settings.inactive_penalty;
        }
    }

    let yanked = input
        .release
        .map(|r| r.is_yanked(&status.current_version))
        .unwrap_or(false);
    if yanked {
        factors.push(format!("Installed version {} was yanked", status.current_version));
    }

    let score = score.clamp(0.0, 1.0);
    let level = RiskLevel::from_score(score);

    let name_deprecated = status.findings.contains(&FindingType::DeprecatedName);
    let action = if name_deprecated || inactive {
        Action::Replace
    } else if status.is_deprecated || yanked {
        Action::Urgent
    } else if input.registry_error.is_some() {
        Action::LookupFailed
    } else if target_version.is_none() {
        Action::UpToDate
    } else {
        match level {
            RiskLevel::Low => Action::SafeUpgrade,
            RiskLevel::Medium => Action::ReviewChangelog,
            RiskLevel::High | RiskLevel::Critical => Action::ManualReview,
        }
    };

    let summary = match &target_version {
        Some(target) => format!(
            "{}: {} {} -> {} ({}, {} risk)",
            action.label(),
            status.name,
            status.current_version,
            target,
            upgrade_kind.label(),
            level.as_str()
        ),
        None => format!("{}: {} {}", action.label(), status.name, status.current_version),
    };

    tracing::debug!(
        package = %status.name,
        score,
        action = action.as_str(),
        "assessed upgrade risk"
    );

    RiskAssessment {
        name: status.name.clone(),
        current_version: status.current_version.clone(),
        target_version,
        upgrade_kind,
        score,
        level,
        factors,
        breaking_changes: input.breaking_changes.clone(),
        action,
        summary,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::{BreakingChange, BreakingKind};
    use crate::deprecation::{check_dependency, DependencyStatus, DeprecationRules};
    use crate::models::dependency::Dependency;
    use crate::registry::ReleaseInfo;
    use crate::usage::UsageReport;
    use std::path::PathBuf;

    fn status(name: &str, version: &str) -> DependencyStatus {
        check_dependency(&Dependency::new(name, version), &DeprecationRules::default())
    }

    fn release(name: &str, stable: &str) -> ReleaseInfo {
        ReleaseInfo {
            name: name.to_string(),
            latest_version: stable.to_string(),
            latest_stable: Some(stable.to_string()),
            newest_version: Some(stable.to_string()),
            versions: vec![stable.to_string()],
            yanked: Vec::new(),
            requires_python: None,
            summary: None,
            description: None,
            changelog_url: None,
            home_page: None,
            latest_release_date: None,
            inactive: false,
        }
    }

    fn breaking(kind: BreakingKind, symbols: &[&str]) -> BreakingChange {
        BreakingChange {
            version: "2.0.0".to_string(),
            kind,
            text: "entry".to_string(),
            matched_symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn usage(name: &str) -> UsageReport {
        UsageReport {
            import_name: name.to_string(),
            files: vec![PathBuf::from("app.py")],
            symbols: vec!["Thing".to_string()],
        }
    }

    #[test]
    fn test_up_to_date() {
        let status = status("httpx", "0.27.0");
        let release = release("httpx", "0.27.0");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.upgrade_kind, UpgradeKind::None);
        assert_eq!(result.target_version, None);
        assert_eq!(result.action, Action::UpToDate);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_patch_is_safe() {
        let status = status("httpx", "0.27.0");
        let release = release("httpx", "0.27.2");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);
        input.changelog_available = true;

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.upgrade_kind, UpgradeKind::Patch);
        assert!((result.score - 0.05).abs() < 1e-9);
        assert_eq!(result.level, RiskLevel::Low);
        assert_eq!(result.action, Action::SafeUpgrade);
        assert_eq!(result.summary, "Safe upgrade: httpx 0.27.0 -> 0.27.2 (patch, low risk)");
    }

    #[test]
    fn test_breaking_changes_capped_and_symbols() {
        let status = status("attrs", "21.4.0");
        let release = release("attrs", "23.1.0");
        let report = usage("attr");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);
        input.changelog_available = true;
        input.usage = Some(&report);
        input.usage_scanned = true;
        input.breaking_changes = vec![
            breaking(BreakingKind::Removal, &["Thing"]),
            breaking(BreakingKind::Rename, &[]),
            breaking(BreakingKind::Incompatible, &[]),
            breaking(BreakingKind::Deprecation, &[]),
        ];

        let result = assess(&input, &RiskSettings::default());
        // 0.5 major + 0.3 capped breaking + 0.2 symbols
        assert!((result.score - 1.0).abs() < 1e-9);
        assert_eq!(result.level, RiskLevel::Critical);
        assert_eq!(result.action, Action::ManualReview);
        assert!(result
            .factors
            .iter()
            .any(|f| f == "Release notes mention used symbols: Thing"));
        assert!(result.factors.iter().any(|f| f == "3 breaking changes in release notes"));
    }

    #[test]
    fn test_unused_package_halves_score() {
        let status = status("somepkg", "1.2.0");
        let release = release("somepkg", "1.3.0");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);
        input.changelog_available = true;
        input.usage_scanned = true;

        let result = assess(&input, &RiskSettings::default());
        assert!((result.score - 0.1).abs() < 1e-9);
        assert_eq!(result.action, Action::SafeUpgrade);
        assert!(result.factors.iter().any(|f| f == "Not imported by the project"));
    }

    #[test]
    fn test_zero_major_minor_bump_is_major() {
        let status = status("somepkg", "0.4.2");
        let release = release("somepkg", "0.5.0");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.upgrade_kind, UpgradeKind::Major);
        assert_eq!(result.action, Action::ManualReview);
    }

    #[test]
    fn test_deprecated_is_urgent() {
        let status = status("django", "2.2.28");
        let release = release("django", "5.0.1");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.action, Action::Urgent);
        assert!(result.factors[0].starts_with("Version 2.2.28 is deprecated"));
    }

    #[test]
    fn test_inactive_major_is_replace_with_penalty() {
        let status = status("somepkg", "1.0.0");
        let mut release = release("somepkg", "2.0.0");
        release.inactive = true;
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);

        let result = assess(&input, &RiskSettings::default());
        assert!((result.score - 0.6).abs() < 1e-9);
        assert_eq!(result.action, Action::Replace);
    }

    #[test]
    fn test_deprecated_name_is_replace() {
        let status = status("legacy-tool", "1.0.0");
        let input = RiskInput::new(&status);
        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.action, Action::Replace);
    }

    #[test]
    fn test_unparseable_current_is_unknown() {
        let status = status("somepkg", "not-a-version");
        let release = release("somepkg", "1.0.0");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.upgrade_kind, UpgradeKind::Unknown);
        assert!((result.score - 0.4).abs() < 1e-9);
        assert_eq!(result.action, Action::ReviewChangelog);
        assert_eq!(result.target_version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_yanked_current_is_urgent() {
        let status = status("somepkg", "1.0.1");
        let mut release = release("somepkg", "1.0.2");
        release.yanked = vec!["1.0.1".to_string()];
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.action, Action::Urgent);
    }

    #[test]
    fn test_registry_failure_degrades() {
        let status = status("somepkg", "1.0.0");
        let mut input = RiskInput::new(&status);
        input.registry_error = Some("Package not found on index: somepkg".to_string());

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.action, Action::LookupFailed);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.factors[0], "Index lookup failed: Package not found on index: somepkg");
        assert_eq!(result.summary, "Lookup failed: somepkg 1.0.0");
    }

    #[test]
    fn test_registry_failure_on_deprecated_stays_urgent() {
        let status = status("requests", "1.2.3");
        let mut input = RiskInput::new(&status);
        input.registry_error = Some("not cached (offline mode)".to_string());

        let result = assess(&input, &RiskSettings::default());
        assert_eq!(result.action, Action::Urgent);
    }

    #[test]
    fn test_deprecation_notice_symbols_do_not_add_risk() {
        let status = status("httpx", "0.27.0");
        let release = release("httpx", "0.27.2");
        let report = usage("httpx");
        let mut input = RiskInput::new(&status);
        input.release = Some(&release);
        input.changelog_available = true;
        input.usage = Some(&report);
        input.usage_scanned = true;
        input.breaking_changes = vec![breaking(BreakingKind::Deprecation, &["get"])];

        let result = assess(&input, &RiskSettings::default());
        assert!((result.score - 0.05).abs() < 1e-9);
        assert_eq!(result.level, RiskLevel::Low);
        assert_eq!(result.action, Action::SafeUpgrade);
        assert!(!result.factors.iter().any(|f| f.starts_with("Release notes mention used symbols")));
        assert!(result.factors.iter().any(|f| f == "1 deprecation notice(s) in release notes"));
    }

    #[test]
    fn test_releases_behind_factor() {
        let status = status("somepkg", "1.0.0");
        let mut info = release("somepkg", "1.3.0");
        info.versions = ["1.0.0", "1.1.0", "1.2.0", "1.3.0"].iter().map(|v| v.to_string()).collect();
        let mut input = RiskInput::new(&status);
        input.release = Some(&info);

        let result = assess(&input, &RiskSettings::default());
        assert!(result.factors.iter().any(|f| f == "3 releases behind"));

        // A single newer release is already covered by the upgrade factor
        let mut single = RiskInput::new(&status);
        let next = release("somepkg", "1.0.1");
        single.release = Some(&next);
        let result = assess(&single, &RiskSettings::default());
        assert!(!result.factors.iter().any(|f| f.ends_with("releases behind")));
    }
}
