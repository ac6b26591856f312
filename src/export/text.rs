//! Plain-text console report

use std::fmt::Write;

use crate::deprecation::HealthState;
use crate::models::report::{AdvisorReport, ScanReport};
use crate::risk::{Action, RiskAssessment};

fn rule(out: &mut String) {
    out.push_str(&"=".repeat(50));
    out.push('\n');
}

/// Classic scan listing followed by the summary block
pub fn render_scan_text(report: &ScanReport) -> String {
    let mut out = String::new();

    rule(&mut out);
    out.push_str("SCAN RESULTS:\n");
    rule(&mut out);

    for status in &report.statuses {
        let label = status.state().label();
        let _ = writeln!(out, "{}: {}=={}", label, status.name, status.current_version);
        match status.state() {
            HealthState::Deprecated => {
                if let Some(ref reason) = status.deprecation_reason {
                    let _ = writeln!(out, "   Reason: {}", reason);
                }
            }
            HealthState::Warning => {
                for warning in &status.warnings {
                    let _ = writeln!(out, "   {}", warning);
                }
            }
            HealthState::Ok => {}
        }
    }

    rule(&mut out);
    out.push_str("SUMMARY:\n");
    let _ = writeln!(out, "Total packages: {}", report.summary.total);
    let _ = writeln!(out, "Deprecated: {}", report.summary.deprecated);
    let _ = writeln!(out, "Warnings: {}", report.summary.warnings);
    let _ = writeln!(out, "Healthy: {}", report.summary.healthy);

    out
}

fn render_assessment(out: &mut String, assessment: &RiskAssessment) {
    let _ = match &assessment.target_version {
        Some(target) => writeln!(
            out,
            "[{}] {} {} -> {} ({}, {} risk, score {:.2})",
            assessment.action.label(),
            assessment.name,
            assessment.current_version,
            target,
            assessment.upgrade_kind.label(),
            assessment.level.as_str(),
            assessment.score
        ),
        None => writeln!(
            out,
            "[{}] {} {}",
            assessment.action.label(),
            assessment.name,
            assessment.current_version
        ),
    };

    for factor in &assessment.factors {
        let _ = writeln!(out, "   - {}", factor);
    }
    for change in &assessment.breaking_changes {
        let _ = write!(out, "   ! {} {}: {}", change.version, change.kind.label(), change.text);
        if !change.matched_symbols.is_empty() {
            let _ = write!(out, " [uses: {}]", change.matched_symbols.join(", "));
        }
        out.push('\n');
    }
}

/// Scan listing plus one block per assessment
///
/// Packages with nothing to do are listed on a single line at the end.
pub fn render_advice_text(report: &AdvisorReport) -> String {
    let mut out = render_scan_text(&report.scan());

    rule(&mut out);
    out.push_str("UPGRADE ADVICE:\n");
    rule(&mut out);

    let (idle, pending): (Vec<&RiskAssessment>, Vec<&RiskAssessment>) = report
        .advice
        .assessments
        .iter()
        .partition(|a| a.action == Action::UpToDate);

    if pending.is_empty() {
        out.push_str("Nothing to upgrade.\n");
    }
    for assessment in &pending {
        render_assessment(&mut out, assessment);
    }
    if !idle.is_empty() {
        let names: Vec<&str> = idle.iter().map(|a| a.name.as_str()).collect();
        let _ = writeln!(out, "Up to date: {}", names.join(", "));
    }

    rule(&mut out);
    out.push_str("ADVICE SUMMARY:\n");
    let _ = writeln!(out, "Upgradable: {}", report.advice.upgradable);
    for action in [
        Action::Urgent,
        Action::Replace,
        Action::ManualReview,
        Action::ReviewChangelog,
        Action::SafeUpgrade,
        Action::LookupFailed,
        Action::UpToDate,
    ] {
        let _ = writeln!(out, "{}: {}", action.label(), report.advice.count_for(action));
    }
    if let Some(files) = report.files_scanned {
        let _ = writeln!(out, "Python files scanned: {}", files);
    }
    if report.offline {
        out.push_str("Offline: index data from cache only\n");
    }

    out
}
