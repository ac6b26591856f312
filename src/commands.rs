//! Command handlers
//!
//! One handler per CLI command. Reports go to stdout (or a file),
//! diagnostics go through `tracing` to stderr.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::advisor::{self, AdviseOptions};
use crate::changelog::{detect_breaking_changes, parse_changelog, sections_between};
use crate::cli::{AdviseArgs, ChangelogArgs, Cli, Command, HistoryCommand, ReportArgs, ScanArgs, USAGE};
use crate::config::Config;
use crate::db::queries;
use crate::export::{self, ExportFormat};
use crate::models::dependency::DependencySource;
use crate::models::scan::{ScanDiff, ScanPackageRecord, ScanRecord};
use crate::parser::Version;
use crate::scanner::PipRunner;
use crate::watcher::ManifestWatcher;
use crate::{CommandError, EXIT_DEPRECATED, EXIT_ERROR, EXIT_OK};

/// Quiet period before a batch of file changes triggers a re-scan
const WATCH_DEBOUNCE: Duration = Duration::from_millis(750);

/// Run a parsed command line, returning the exit code
pub async fn execute(cli: Cli) -> Result<i32, CommandError> {
    // Help works even when the config file is broken
    let config = match cli.command {
        Command::Help => Config::default(),
        _ => Config::load(cli.config.as_deref())?,
    };

    match cli.command {
        Command::Help => {
            print!("{}", USAGE);
            Ok(EXIT_OK)
        }
        Command::Scan(args) => scan(&config, args).await,
        Command::Advise(args) => advise(&config, args).await,
        Command::Changelog(args) => changelog(args),
        Command::History(history_command) => history(&config, history_command),
        Command::Install(spec) => install(&config, spec).await,
        Command::Uninstall(name) => uninstall(&config, name).await,
        Command::Update(name) => update(&config, name).await,
        Command::UpdateAll => update_all(&config).await,
        Command::Watch { project, file } => watch(&config, project, file).await,
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn dependency_source(file: Option<PathBuf>) -> DependencySource {
    match file {
        Some(path) => DependencySource::File(path),
        None => DependencySource::PipFreeze,
    }
}

/// Print a report or write it to the requested location
///
/// `--output` wins over `[report] output_dir`; with neither, the report
/// goes to stdout.
fn emit_report(
    content: &str,
    report: &ReportArgs,
    config: &Config,
    prefix: &str,
    format: ExportFormat,
) -> Result<(), CommandError> {
    let path = match (&report.output, &config.report.output_dir) {
        (Some(output), _) => Some(export::resolve_output_path(output, prefix, format)),
        (None, Some(dir)) => Some(dir.join(export::generate_export_filename(prefix, format.extension()))),
        (None, None) => None,
    };

    match path {
        Some(path) => {
            export::write_export(content, &path)?;
            println!("Report written to {}", path.display());
        }
        None => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

/// Run a blocking pip operation off the async runtime
async fn run_pip<T, F>(config: &Config, op: F) -> Result<T, CommandError>
where
    T: Send + 'static,
    F: FnOnce(PipRunner) -> Result<T, crate::scanner::PipError> + Send + 'static,
{
    let pip = PipRunner::new(&config.pip.executable);
    let result = tokio::task::spawn_blocking(move || op(pip))
        .await
        .map_err(|e| CommandError::Internal(format!("Pip task failed: {}", e)))??;
    Ok(result)
}

// ============================================================================
// Scan / Advise
// ============================================================================

async fn scan(config: &Config, args: ScanArgs) -> Result<i32, CommandError> {
    let format = args.report.format.unwrap_or(config.report.format);
    let source = dependency_source(args.file);
    let db = if args.no_save {
        None
    } else {
        advisor::optional_database(config)
    };

    let report = advisor::run_scan(config, &source, db.as_ref()).await?;
    let content = export::render_scan(&report, format)?;
    emit_report(&content, &args.report, config, "pydguard_scan", format)?;

    if args.strict && report.summary.deprecated > 0 {
        tracing::warn!("{} deprecated package(s) found", report.summary.deprecated);
        return Ok(EXIT_DEPRECATED);
    }
    Ok(EXIT_OK)
}

async fn advise(config: &Config, args: AdviseArgs) -> Result<i32, CommandError> {
    let format = args.report.format.unwrap_or(config.report.format);
    let source = dependency_source(args.file);

    // The release cache lives in the history database, so it is opened
    // even with --no-save
    let db = advisor::optional_database(config);

    let options = AdviseOptions {
        project: args.project,
        changelogs: args.changelogs,
        offline: args.offline,
        include_prereleases: args.prereleases,
        only: args.only,
        save: !args.no_save,
    };

    let report = advisor::run_advice(config, &source, &options, db.as_ref()).await?;
    let content = export::render_advice(&report, format)?;
    emit_report(&content, &args.report, config, "pydguard_advice", format)?;
    Ok(EXIT_OK)
}

// ============================================================================
// Changelog
// ============================================================================

fn parse_version_arg(flag: &str, raw: &str) -> Result<Version, CommandError> {
    Version::parse(raw).map_err(|_| CommandError::Usage(format!("Invalid {} version: {}", flag, raw)))
}

fn changelog(args: ChangelogArgs) -> Result<i32, CommandError> {
    let from = parse_version_arg("--from", &args.from)?;
    let to = args
        .to
        .as_deref()
        .map(|raw| parse_version_arg("--to", raw))
        .transpose()?;

    let text = std::fs::read_to_string(&args.path)?;
    let sections = parse_changelog(&text);
    tracing::info!("Parsed {} release sections from {}", sections.len(), args.path.display());

    let selected = sections_between(&sections, &from, to.as_ref());
    let changes = detect_breaking_changes(selected.iter().copied(), &args.symbols);

    print!("{}", render_changelog(&args, selected.len(), &changes));
    Ok(EXIT_OK)
}

fn render_changelog(
    args: &ChangelogArgs,
    release_count: usize,
    changes: &[crate::changelog::BreakingChange],
) -> String {
    let mut out = String::new();
    let range = match &args.to {
        Some(to) => format!("{} -> {}", args.from, to),
        None => format!("after {}", args.from),
    };
    let _ = writeln!(out, "{} release(s) {}", release_count, range);

    if changes.is_empty() {
        out.push_str("No breaking changes found.\n");
        return out;
    }

    for change in changes {
        let _ = write!(out, "{} [{}] {}", change.version, change.kind.label(), change.text);
        if !change.matched_symbols.is_empty() {
            let _ = write!(out, " (uses: {})", change.matched_symbols.join(", "));
        }
        out.push('\n');
    }

    let breaking = changes.iter().filter(|c| c.kind.is_breaking()).count();
    let _ = writeln!(
        out,
        "{} breaking change(s), {} deprecation notice(s)",
        breaking,
        changes.len() - breaking
    );
    out
}

// ============================================================================
// History
// ============================================================================

fn history(config: &Config, command: HistoryCommand) -> Result<i32, CommandError> {
    let db = advisor::open_database(config)?;

    let output = match command {
        HistoryCommand::List { limit } => {
            let scans = db.with_connection(|conn| queries::get_scans(conn, limit))?;
            render_scan_list(&scans)
        }
        HistoryCommand::Show(scan_id) => {
            let scan = db
                .with_connection(|conn| queries::get_scan(conn, scan_id))?
                .ok_or(crate::db::DbError::ScanNotFound(scan_id))?;
            let packages = db.with_connection(|conn| queries::get_scan_packages(conn, scan_id))?;
            render_scan_detail(&scan, &packages)
        }
        HistoryCommand::Diff => match db.with_connection(queries::compare_latest_scans)? {
            Some(diff) => render_scan_diff(&diff),
            None => "At least two stored scans are needed for a diff.\n".to_string(),
        },
    };

    print!("{}", output);
    Ok(EXIT_OK)
}

fn render_scan_list(scans: &[ScanRecord]) -> String {
    if scans.is_empty() {
        return "No scans recorded yet.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<25}  {:>5}  {:>10}  {:>8}  {:>7}  SOURCE",
        "ID", "DATE", "TOTAL", "DEPRECATED", "WARNINGS", "HEALTHY"
    );
    for scan in scans {
        let _ = writeln!(
            out,
            "{:>5}  {:<25}  {:>5}  {:>10}  {:>8}  {:>7}  {}",
            scan.id, scan.created_at, scan.total, scan.deprecated, scan.warnings, scan.healthy, scan.source
        );
    }
    out
}

fn render_scan_detail(scan: &ScanRecord, packages: &[ScanPackageRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scan #{} at {} ({})", scan.id, scan.created_at, scan.source);
    let _ = writeln!(
        out,
        "Total: {}  Deprecated: {}  Warnings: {}  Healthy: {}",
        scan.total, scan.deprecated, scan.warnings, scan.healthy
    );

    for package in packages {
        let _ = write!(
            out,
            "{}: {}=={}",
            package.state.to_uppercase(),
            package.name,
            package.version
        );
        if let Some(ref target) = package.target_version {
            let _ = write!(out, " -> {}", target);
        }
        if let (Some(level), Some(score)) = (&package.risk_level, package.risk_score) {
            let _ = write!(out, " ({} risk, score {:.2})", level, score);
        }
        out.push('\n');
        if let Some(ref reason) = package.reason {
            let _ = writeln!(out, "   Reason: {}", reason);
        }
        for warning in &package.warnings {
            let _ = writeln!(out, "   {}", warning);
        }
    }
    out
}

fn render_scan_diff(diff: &ScanDiff) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scan #{} -> #{}", diff.older_scan_id, diff.newer_scan_id);

    if diff.is_empty() {
        out.push_str("No changes.\n");
        return out;
    }

    let mut list = |title: &str, names: &[String]| {
        if !names.is_empty() {
            let _ = writeln!(out, "{}: {}", title, names.join(", "));
        }
    };
    list("Newly deprecated", &diff.newly_deprecated);
    list("Resolved", &diff.resolved);
    list("Added", &diff.added);
    list("Removed", &diff.removed);

    for (name, old, new) in &diff.version_changes {
        let _ = writeln!(out, "Changed: {} {} -> {}", name, old, new);
    }
    out
}

// ============================================================================
// Pip Package Management
// ============================================================================

async fn install(config: &Config, spec: String) -> Result<i32, CommandError> {
    let shown = spec.clone();
    run_pip(config, move |pip| pip.install(&spec)).await?;
    println!("Successfully installed {}", shown);
    Ok(EXIT_OK)
}

async fn uninstall(config: &Config, name: String) -> Result<i32, CommandError> {
    let shown = name.clone();
    run_pip(config, move |pip| pip.uninstall(&name)).await?;
    println!("Successfully uninstalled {}", shown);
    Ok(EXIT_OK)
}

async fn update(config: &Config, name: String) -> Result<i32, CommandError> {
    let shown = name.clone();
    run_pip(config, move |pip| pip.update(&name)).await?;
    println!("Successfully updated {}", shown);
    Ok(EXIT_OK)
}

async fn update_all(config: &Config) -> Result<i32, CommandError> {
    let outcome = run_pip(config, |pip| pip.update_all()).await?;

    for name in &outcome.updated {
        println!("Successfully updated {}", name);
    }
    for (name, error) in &outcome.failed {
        eprintln!("Failed to update {}: {}", name, error);
    }
    println!(
        "Updated {} package(s), {} failure(s)",
        outcome.updated.len(),
        outcome.failed.len()
    );

    Ok(if outcome.all_succeeded() { EXIT_OK } else { EXIT_ERROR })
}

// ============================================================================
// Watch
// ============================================================================

async fn watch(config: &Config, project: Option<PathBuf>, file: Option<PathBuf>) -> Result<i32, CommandError> {
    let project = project.unwrap_or_else(|| PathBuf::from("."));
    let source = watch_source(&project, file)?;
    tracing::info!("Watch re-scans {}", source.label());

    let mut watcher = ManifestWatcher::new(project.clone())?;
    watcher.start()?;
    println!("Watching {} for dependency changes (Ctrl+C to stop)", project.display());

    rescan(config, &source).await;

    loop {
        let batch = match tokio::task::block_in_place(|| watcher.next_batch(WATCH_DEBOUNCE)) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::info!("Watcher stopped: {}", e);
                break;
            }
        };

        for event in &batch {
            println!("Changed: {}", display_relative(event.path(), &project));
        }
        rescan(config, &source).await;
    }

    watcher.stop()?;
    Ok(EXIT_OK)
}

/// Explicit file, else the project's requirements file, else `pip freeze`
fn watch_source(project: &Path, file: Option<PathBuf>) -> Result<DependencySource, CommandError> {
    if let Some(path) = file {
        return Ok(DependencySource::File(path));
    }

    let found = crate::parser::find_requirement_files(project)?;
    let preferred = found
        .iter()
        .find(|p| p.file_name().map(|n| n == "requirements.txt").unwrap_or(false))
        .or_else(|| found.first());

    Ok(match preferred {
        Some(path) => DependencySource::File(path.clone()),
        None => DependencySource::PipFreeze,
    })
}

/// Scan and print; failures are reported and the watch continues
async fn rescan(config: &Config, source: &DependencySource) {
    let rendered = advisor::run_scan(config, source, None)
        .await
        .and_then(|report| export::render_scan(&report, ExportFormat::Text));

    match rendered {
        Ok(content) => print!("{}", content),
        Err(e) => eprintln!("Scan failed: {}", e),
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    path.strip_prefix(&root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::{BreakingChange, BreakingKind};

    fn record(id: i64) -> ScanRecord {
        ScanRecord {
            id,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            source: "pip freeze".to_string(),
            total: 3,
            deprecated: 1,
            warnings: 1,
            healthy: 1,
        }
    }

    #[test]
    fn test_render_scan_list() {
        assert_eq!(render_scan_list(&[]), "No scans recorded yet.\n");

        let out = render_scan_list(&[record(2), record(1)]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("DEPRECATED"));
        assert!(lines[1].trim_start().starts_with("2  2024-01-01"));
        assert!(lines[2].ends_with("pip freeze"));
    }

    #[test]
    fn test_render_scan_detail() {
        let packages = vec![ScanPackageRecord {
            scan_id: 1,
            name: "requests".to_string(),
            version: "1.2.3".to_string(),
            state: "deprecated".to_string(),
            reason: Some("Version 1.2.3 is deprecated. Minimum supported version: 2.0.0".to_string()),
            warnings: Vec::new(),
            target_version: Some("2.31.0".to_string()),
            risk_level: Some("high".to_string()),
            risk_score: Some(0.5),
        }];

        let out = render_scan_detail(&record(1), &packages);
        assert!(out.contains("DEPRECATED: requests==1.2.3 -> 2.31.0 (high risk, score 0.50)\n"));
        assert!(out.contains("   Reason: Version 1.2.3 is deprecated."));
    }

    #[test]
    fn test_render_scan_diff() {
        let diff = ScanDiff {
            older_scan_id: 1,
            newer_scan_id: 2,
            newly_deprecated: vec!["flask".to_string()],
            resolved: vec!["requests".to_string()],
            version_changes: vec![("requests".to_string(), "1.0".to_string(), "2.31.0".to_string())],
            added: Vec::new(),
            removed: Vec::new(),
        };

        let out = render_scan_diff(&diff);
        assert_eq!(
            out,
            "Scan #1 -> #2\nNewly deprecated: flask\nResolved: requests\nChanged: requests 1.0 -> 2.31.0\n"
        );

        let empty = ScanDiff {
            older_scan_id: 1,
            newer_scan_id: 2,
            ..Default::default()
        };
        assert!(render_scan_diff(&empty).ends_with("No changes.\n"));
    }

    #[test]
    fn test_render_changelog() {
        let args = ChangelogArgs {
            path: PathBuf::from("CHANGES.md"),
            from: "1.0".to_string(),
            to: Some("2.0".to_string()),
            symbols: vec!["get".to_string()],
        };
        let changes = vec![
            BreakingChange {
                version: "2.0".to_string(),
                kind: BreakingKind::Removal,
                text: "Removed get".to_string(),
                matched_symbols: vec!["get".to_string()],
            },
            BreakingChange {
                version: "1.5".to_string(),
                kind: BreakingKind::Deprecation,
                text: "Deprecated post".to_string(),
                matched_symbols: Vec::new(),
            },
        ];

        let out = render_changelog(&args, 2, &changes);
        assert!(out.starts_with("2 release(s) 1.0 -> 2.0\n"));
        assert!(out.contains("(uses: get)\n"));
        assert!(out.ends_with("1 breaking change(s), 1 deprecation notice(s)\n"));

        assert!(render_changelog(&args, 0, &[]).ends_with("No breaking changes found.\n"));
    }

    #[test]
    fn test_invalid_version_argument_is_usage_error() {
        assert!(matches!(
            parse_version_arg("--from", "not a version"),
            Err(CommandError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_command_strict_exit_code() {
        let dir = tempfile::TempDir::new().unwrap();
        let reqs = dir.path().join("requirements.txt");
        std::fs::write(&reqs, "requests==1.0.0\n").unwrap();

        let mut config = Config::default();
        config.database.enabled = false;

        let args = ScanArgs {
            file: Some(reqs.clone()),
            report: ReportArgs {
                format: Some(ExportFormat::Json),
                output: Some(dir.path().to_path_buf()),
            },
            no_save: true,
            strict: true,
        };
        assert_eq!(scan(&config, args).await.unwrap(), EXIT_DEPRECATED);

        let written: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("pydguard_scan_"))
            .collect();
        assert_eq!(written.len(), 1);

        let args = ScanArgs {
            file: Some(reqs),
            report: ReportArgs {
                format: Some(ExportFormat::Json),
                output: Some(dir.path().join("plain.json")),
            },
            no_save: true,
            strict: false,
        };
        assert_eq!(scan(&config, args).await.unwrap(), EXIT_OK);
    }

    #[test]
    fn test_watch_source_discovers_requirements() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(watch_source(dir.path(), None).unwrap(), DependencySource::PipFreeze);

        std::fs::write(dir.path().join("requirements-dev.txt"), "pytest==8.0.0\n").unwrap();
        assert_eq!(
            watch_source(dir.path(), None).unwrap(),
            DependencySource::File(dir.path().join("requirements-dev.txt"))
        );

        std::fs::write(dir.path().join("requirements.txt"), "requests==2.31.0\n").unwrap();
        assert_eq!(
            watch_source(dir.path(), None).unwrap(),
            DependencySource::File(dir.path().join("requirements.txt"))
        );

        let explicit = PathBuf::from("frozen.txt");
        assert_eq!(
            watch_source(dir.path(), Some(explicit.clone())).unwrap(),
            DependencySource::File(explicit)
        );
    }
}
