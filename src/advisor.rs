//! Scan and advice orchestration
//!
//! Collects dependencies, runs the deprecation check and, for advice,
//! combines index metadata, release notes and project usage into risk
//! assessments.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::changelog::{detect_breaking_changes, parse_changelog, sections_between, BreakingChange, ChangelogSection};
use crate::config::Config;
use crate::db::{queries, Database, DbError};
use crate::deprecation::{check_deprecation_status, summarize, DependencyStatus, ScanSummary};
use crate::models::dependency::{normalize_name, Dependency, DependencySource};
use crate::models::report::{AdvisorReport, ScanReport};
use crate::models::scan::ScanPackageRecord;
use crate::parser::freeze::read_freeze_file;
use crate::parser::{parse_requirements, ParserError, Version};
use crate::registry::{RegistryClient, ReleaseInfo};
use crate::risk::{assess, AdvisorSummary, RiskAssessment, RiskInput, RiskSettings};
use crate::scanner::PipRunner;
use crate::usage::{scan_project, ProjectUsage};
use crate::CommandError;

/// Cache entries older than this are dropped after an online lookup
const CACHE_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;

/// Extensions tried for local release notes, in order
const CHANGELOG_EXTENSIONS: &[&str] = &["md", "rst", "txt"];

/// Options of an advice run
#[derive(Debug, Clone, Default)]
pub struct AdviseOptions {
    /// Project whose imports are scanned
    pub project: Option<PathBuf>,
    /// Directory of `<name>.md|.rst|.txt` release notes
    pub changelogs: Option<PathBuf>,
    pub offline: bool,
    pub include_prereleases: bool,
    /// Restrict advice to these packages
    pub only: Vec<String>,
    pub save: bool,
}

/// Open the history database, creating the schema when needed
pub fn open_database(config: &Config) -> Result<Database, DbError> {
    let path = config.database_path();
    tracing::debug!("Database path: {:?}", path);

    let database = Database::new(path)?;
    database.initialize()?;
    Ok(database)
}

/// History database for a run, or `None` when disabled or unavailable
pub fn optional_database(config: &Config) -> Option<Database> {
    if !config.database.enabled {
        return None;
    }
    match open_database(config) {
        Ok(database) => Some(database),
        Err(e) => {
            tracing::warn!("History database unavailable: {}", e);
            None
        }
    }
}

/// Read pinned dependencies from a requirements or freeze file
///
/// Requirements syntax is tried first; unpinned requirements are skipped
/// with a warning. Files that are not valid requirements are read as plain
/// `pip freeze` output.
pub fn load_dependency_file(path: &Path) -> Result<Vec<Dependency>, ParserError> {
    let content = std::fs::read_to_string(path)?;

    match parse_requirements(&content) {
        Ok(requirements) => {
            let mut dependencies = Vec::with_capacity(requirements.len());
            for requirement in requirements {
                match requirement.pinned() {
                    Some(dependency) => dependencies.push(dependency),
                    None => tracing::warn!(
                        "Skipping unpinned requirement on line {}: {}{}",
                        requirement.line,
                        requirement.name,
                        requirement.specifier_string()
                    ),
                }
            }
            Ok(dependencies)
        }
        Err(e) => {
            tracing::debug!("Reading {} as freeze output ({})", path.display(), e);
            read_freeze_file(path)
        }
    }
}

/// Dependencies from `pip freeze` or a file
pub async fn collect_dependencies(
    source: &DependencySource,
    pip: &PipRunner,
) -> Result<Vec<Dependency>, CommandError> {
    let owned_source = source.clone();
    let pip = pip.clone();

    let dependencies = tokio::task::spawn_blocking(move || -> Result<Vec<Dependency>, CommandError> {
        match owned_source {
            DependencySource::PipFreeze => Ok(pip.installed_packages()?),
            DependencySource::File(path) => Ok(load_dependency_file(&path)?),
        }
    })
    .await
    .map_err(|e| CommandError::Internal(format!("Dependency collection task failed: {}", e)))??;

    tracing::info!(
        "Collected {} pinned dependencies from {}",
        dependencies.len(),
        source.label()
    );
    Ok(dependencies)
}

/// History rows for a scan, with assessment columns where available
pub fn package_records(
    statuses: &[DependencyStatus],
    assessments: &[RiskAssessment],
) -> Vec<ScanPackageRecord> {
    statuses
        .iter()
        .map(|status| {
            let assessment = assessments.iter().find(|a| a.name == status.name);
            ScanPackageRecord {
                scan_id: 0,
                name: status.name.clone(),
                version: status.current_version.clone(),
                state: status.state().as_str().to_string(),
                reason: status.deprecation_reason.clone(),
                warnings: status.warnings.clone(),
                target_version: assessment.and_then(|a| a.target_version.clone()),
                risk_level: assessment.map(|a| a.level.as_str().to_string()),
                risk_score: assessment.map(|a| a.score),
            }
        })
        .collect()
}

/// Store a scan in the history database
pub fn record_scan(
    db: &Database,
    source: &str,
    summary: &ScanSummary,
    statuses: &[DependencyStatus],
    assessments: &[RiskAssessment],
) -> Result<i64, DbError> {
    let records = package_records(statuses, assessments);
    db.with_connection(|conn| queries::insert_scan(conn, source, summary, &records))
}

fn try_record_scan(
    db: Option<&Database>,
    source: &str,
    summary: &ScanSummary,
    statuses: &[DependencyStatus],
    assessments: &[RiskAssessment],
) -> Option<i64> {
    let db = db?;
    match record_scan(db, source, summary, statuses, assessments) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!("Failed to store scan history: {}", e);
            None
        }
    }
}

/// Deprecation scan of a dependency source
///
/// The scan is stored when `db` is given; a storage failure only logs.
pub async fn run_scan(
    config: &Config,
    source: &DependencySource,
    db: Option<&Database>,
) -> Result<ScanReport, CommandError> {
    let pip = PipRunner::new(&config.pip.executable);
    let dependencies = collect_dependencies(source, &pip).await?;

    let statuses = check_deprecation_status(&dependencies, &config.deprecation_rules());
    let summary = summarize(&statuses);
    let label = source.label();
    let scan_id = try_record_scan(db, &label, &summary, &statuses, &[]);

    Ok(ScanReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        source: label,
        statuses,
        summary,
        scan_id,
    })
}

/// Index metadata per normalized name, or the reason it is missing
async fn lookup_releases(
    config: &Config,
    names: Vec<String>,
    offline: bool,
    db: Option<&Database>,
) -> Result<HashMap<String, Result<ReleaseInfo, String>>, CommandError> {
    // Offline runs accept stale entries
    let ttl = if offline {
        u64::MAX
    } else {
        config.registry.cache_ttl_secs
    };

    let mut results = HashMap::new();
    let mut misses = Vec::new();

    for name in names {
        let cached = match db {
            Some(db) => db
                .with_connection(|conn| queries::get_cached_release(conn, &name, ttl))
                .unwrap_or_else(|e| {
                    tracing::warn!("Release cache read failed for {}: {}", name, e);
                    None
                }),
            None => None,
        };
        match cached {
            Some(info) => {
                results.insert(name, Ok(info));
            }
            None => misses.push(name),
        }
    }

    tracing::info!(
        cached = results.len(),
        missing = misses.len(),
        "release cache lookup"
    );

    if misses.is_empty() {
        return Ok(results);
    }

    if offline {
        for name in misses {
            results.insert(name, Err("not cached (offline mode)".to_string()));
        }
        return Ok(results);
    }

    let client = RegistryClient::new(
        &config.registry.index_url,
        Duration::from_secs(config.registry.timeout_secs),
    )?;

    for (name, result) in client.fetch_many(misses, config.registry.max_concurrent).await {
        match result {
            Ok(info) => {
                if let Some(db) = db {
                    if let Err(e) = db.with_connection(|conn| queries::put_cached_release(conn, &name, &info)) {
                        tracing::warn!("Release cache write failed for {}: {}", name, e);
                    }
                }
                results.insert(name, Ok(info));
            }
            Err(e) => {
                results.insert(name, Err(e.to_string()));
            }
        }
    }

    if let Some(db) = db {
        let retention = config.registry.cache_ttl_secs.max(CACHE_RETENTION_SECS);
        match db.with_connection(|conn| queries::prune_release_cache(conn, retention)) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!("Pruned {} stale cache entries", removed),
            Err(e) => tracing::warn!("Release cache prune failed: {}", e),
        }
    }

    Ok(results)
}

/// Release notes for a package
///
/// A file in `dir` named after the package wins over the index
/// description.
pub fn changelog_text(name: &str, release: Option<&ReleaseInfo>, dir: Option<&Path>) -> Option<String> {
    if let Some(dir) = dir {
        let mut stems = vec![name.to_string()];
        let normalized = normalize_name(name);
        if normalized != name {
            stems.push(normalized);
        }

        for stem in &stems {
            for ext in CHANGELOG_EXTENSIONS {
                let path = dir.join(format!("{}.{}", stem, ext));
                if !path.is_file() {
                    continue;
                }
                match std::fs::read_to_string(&path) {
                    Ok(text) => return Some(text),
                    Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
                }
            }
        }
    }

    release.and_then(|r| r.description.clone())
}

/// Breaking entries released after `current` up to and including `target`
pub fn breaking_between<S: AsRef<str>>(
    sections: &[ChangelogSection],
    current: &str,
    target: &str,
    symbols: &[S],
) -> Vec<BreakingChange> {
    let Ok(from) = Version::parse(current) else {
        return Vec::new();
    };
    let to = Version::parse(target).ok();
    detect_breaking_changes(sections_between(sections, &from, to.as_ref()), symbols)
}

fn is_selected(name: &str, only: &[String]) -> bool {
    only.is_empty() || only.iter().any(|o| normalize_name(o) == normalize_name(name))
}

/// Full advice run: scan, index lookups, release notes, usage, risk
pub async fn run_advice(
    config: &Config,
    source: &DependencySource,
    options: &AdviseOptions,
    db: Option<&Database>,
) -> Result<AdvisorReport, CommandError> {
    let pip = PipRunner::new(&config.pip.executable);
    let dependencies = collect_dependencies(source, &pip).await?;

    let statuses = check_deprecation_status(&dependencies, &config.deprecation_rules());
    let summary = summarize(&statuses);

    let settings = RiskSettings {
        include_prereleases: config.risk.include_prereleases || options.include_prereleases,
        ..config.risk.clone()
    };
    let offline = options.offline || config.registry.offline;

    for wanted in &options.only {
        if !statuses.iter().any(|s| is_selected(&s.name, std::slice::from_ref(wanted))) {
            tracing::warn!("--only {}: package not found in {}", wanted, source.label());
        }
    }
    let selected: Vec<&DependencyStatus> = statuses
        .iter()
        .filter(|s| is_selected(&s.name, &options.only))
        .collect();

    let usage: Option<ProjectUsage> = match &options.project {
        Some(dir) => {
            let dir = dir.clone();
            let excludes = config.usage.exclude.clone();
            let usage = tokio::task::spawn_blocking(move || scan_project(&dir, &excludes))
                .await
                .map_err(|e| CommandError::Internal(format!("Project scan task failed: {}", e)))??;
            tracing::info!(
                "Scanned {} Python files, {} imported modules",
                usage.files_scanned,
                usage.module_count()
            );
            Some(usage)
        }
        None => None,
    };

    let mut names: Vec<String> = selected.iter().map(|s| normalize_name(&s.name)).collect();
    names.sort();
    names.dedup();
    let releases = lookup_releases(config, names, offline, db).await?;

    let mut assessments = Vec::with_capacity(selected.len());
    for status in selected {
        let (release, registry_error) = match releases.get(&normalize_name(&status.name)) {
            Some(Ok(info)) => (Some(info), None),
            Some(Err(e)) => (None, Some(e.clone())),
            None => (None, None),
        };
        let usage_report = usage.as_ref().and_then(|u| u.for_dependency(&status.name));

        let mut input = RiskInput::new(status);
        input.release = release;
        input.registry_error = registry_error;
        input.usage = usage_report.as_ref();
        input.usage_scanned = usage.is_some();

        let notes = changelog_text(&status.name, release, options.changelogs.as_deref());
        let sections = notes.as_deref().map(parse_changelog).unwrap_or_default();
        input.changelog_available = !sections.is_empty();

        if let Some(target) = release.and_then(|r| r.target_version(settings.include_prereleases)) {
            let symbols: &[String] = usage_report.as_ref().map(|u| u.symbols.as_slice()).unwrap_or(&[]);
            input.breaking_changes = breaking_between(&sections, &status.current_version, target, symbols);
        }

        assessments.push(assess(&input, &settings));
    }

    let label = source.label();
    let scan_id = if options.save {
        try_record_scan(db, &label, &summary, &statuses, &assessments)
    } else {
        None
    };

    Ok(AdvisorReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        source: label,
        statuses,
        summary,
        advice: AdvisorSummary::from_assessments(assessments),
        files_scanned: usage.as_ref().map(|u| u.files_scanned),
        offline,
        scan_id,
    })
}
