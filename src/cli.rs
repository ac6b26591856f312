//! Command-line parsing
//!
//! Global options come before the command name; everything after it is
//! parsed by the command's own option loop.

use std::path::PathBuf;

use crate::export::ExportFormat;
use crate::CommandError;

pub const USAGE: &str = "\
pydguard - dependency analyzer and upgrade advisor for Python environments

Usage: pydguard [--config PATH] [-v|-vv] [-q] <command> [options]

Commands:
  scan      [--file PATH] [--format text|json|csv] [--output PATH] [--no-save] [--strict]
  advise    [--file PATH] [--project DIR] [--changelogs DIR] [--offline]
            [--prereleases] [--only NAME[,NAME...]] [--format F] [--output PATH] [--no-save]
  changelog PATH --from VERSION [--to VERSION] [--symbols a,b,c]
  history   [--limit N] | history show ID | history diff
  install   SPEC
  uninstall NAME
  update    NAME
  update-all
  watch     [--project DIR] [--file PATH]
  help

Exit codes: 0 success, 1 error, 2 usage error, 3 deprecated packages (scan --strict)
";

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub config: Option<PathBuf>,
    /// -1 for `-q`, 0 by default, +1 per `-v`
    pub verbosity: i8,
    pub command: Command,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportArgs {
    pub format: Option<ExportFormat>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanArgs {
    pub file: Option<PathBuf>,
    pub report: ReportArgs,
    pub no_save: bool,
    pub strict: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdviseArgs {
    pub file: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub changelogs: Option<PathBuf>,
    pub offline: bool,
    pub prereleases: bool,
    pub only: Vec<String>,
    pub report: ReportArgs,
    pub no_save: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangelogArgs {
    pub path: PathBuf,
    pub from: String,
    pub to: Option<String>,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryCommand {
    List { limit: Option<u32> },
    Show(i64),
    Diff,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scan(ScanArgs),
    Advise(AdviseArgs),
    Changelog(ChangelogArgs),
    History(HistoryCommand),
    Install(String),
    Uninstall(String),
    Update(String),
    UpdateAll,
    Watch {
        project: Option<PathBuf>,
        file: Option<PathBuf>,
    },
    Help,
}

fn usage_error(message: impl Into<String>) -> CommandError {
    CommandError::Usage(message.into())
}

/// Value following an option, advancing the cursor past both
fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, CommandError> {
    match args.get(*i + 1) {
        Some(val) => {
            *i += 2;
            Ok(val.as_str())
        }
        None => Err(usage_error(format!("{} requires a value", flag))),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse arguments, excluding the program name
pub fn parse_args(args: &[String]) -> Result<Cli, CommandError> {
    let mut config = None;
    let mut verbosity: i8 = 0;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => config = Some(PathBuf::from(value(args, &mut i, "--config")?)),
            "-v" | "--verbose" => {
                verbosity = verbosity.max(0) + 1;
                i += 1;
            }
            "-vv" => {
                verbosity = 2;
                i += 1;
            }
            "-q" | "--quiet" => {
                verbosity = -1;
                i += 1;
            }
            "-h" | "--help" => {
                return Ok(Cli {
                    config,
                    verbosity,
                    command: Command::Help,
                })
            }
            other if other.starts_with('-') => {
                return Err(usage_error(format!("Unknown option: {}", other)))
            }
            _ => break,
        }
    }

    let command = match args.get(i) {
        None => Command::Help,
        Some(name) => parse_command(name, &args[i + 1..])?,
    };

    Ok(Cli {
        config,
        verbosity,
        command,
    })
}

fn parse_command(name: &str, rest: &[String]) -> Result<Command, CommandError> {
    match name {
        "scan" => parse_scan(rest).map(Command::Scan),
        "advise" => parse_advise(rest).map(Command::Advise),
        "changelog" => parse_changelog(rest).map(Command::Changelog),
        "history" => parse_history(rest).map(Command::History),
        "install" => single_positional(rest, "install", "SPEC").map(Command::Install),
        "uninstall" => single_positional(rest, "uninstall", "NAME").map(Command::Uninstall),
        "update" => single_positional(rest, "update", "NAME").map(Command::Update),
        "update-all" => {
            no_arguments(rest, "update-all")?;
            Ok(Command::UpdateAll)
        }
        "watch" => parse_watch(rest),
        "help" => Ok(Command::Help),
        other => Err(usage_error(format!("Unknown command: {}", other))),
    }
}

/// `--format` / `--output`, shared by the reporting commands
fn parse_report_flag(
    args: &[String],
    i: &mut usize,
    report: &mut ReportArgs,
) -> Result<bool, CommandError> {
    match args[*i].as_str() {
        "--format" => {
            report.format = Some(value(args, i, "--format")?.parse()?);
            Ok(true)
        }
        "--output" | "-o" => {
            report.output = Some(PathBuf::from(value(args, i, "--output")?));
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn parse_scan(args: &[String]) -> Result<ScanArgs, CommandError> {
    let mut scan = ScanArgs::default();

    let mut i = 0;
    while i < args.len() {
        if parse_report_flag(args, &mut i, &mut scan.report)? {
            continue;
        }
        match args[i].as_str() {
            "--file" | "-f" => scan.file = Some(PathBuf::from(value(args, &mut i, "--file")?)),
            "--no-save" => {
                scan.no_save = true;
                i += 1;
            }
            "--strict" => {
                scan.strict = true;
                i += 1;
            }
            other => return Err(usage_error(format!("Unknown argument for scan: {}", other))),
        }
    }

    Ok(scan)
}

fn parse_advise(args: &[String]) -> Result<AdviseArgs, CommandError> {
    let mut advise = AdviseArgs::default();

    let mut i = 0;
    while i < args.len() {
        if parse_report_flag(args, &mut i, &mut advise.report)? {
            continue;
        }
        match args[i].as_str() {
            "--file" | "-f" => advise.file = Some(PathBuf::from(value(args, &mut i, "--file")?)),
            "--project" | "-p" => {
                advise.project = Some(PathBuf::from(value(args, &mut i, "--project")?))
            }
            "--changelogs" => {
                advise.changelogs = Some(PathBuf::from(value(args, &mut i, "--changelogs")?))
            }
            "--only" => advise.only.extend(split_list(value(args, &mut i, "--only")?)),
            "--offline" => {
                advise.offline = true;
                i += 1;
            }
            "--prereleases" => {
                advise.prereleases = true;
                i += 1;
            }
            "--no-save" => {
                advise.no_save = true;
                i += 1;
            }
            other => return Err(usage_error(format!("Unknown argument for advise: {}", other))),
        }
    }

    Ok(advise)
}

fn parse_changelog(args: &[String]) -> Result<ChangelogArgs, CommandError> {
    let mut path = None;
    let mut from = None;
    let mut to = None;
    let mut symbols = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--from" => from = Some(value(args, &mut i, "--from")?.to_string()),
            "--to" => to = Some(value(args, &mut i, "--to")?.to_string()),
            "--symbols" => symbols.extend(split_list(value(args, &mut i, "--symbols")?)),
            other if other.starts_with('-') => {
                return Err(usage_error(format!("Unknown argument for changelog: {}", other)))
            }
            other => {
                if path.is_some() {
                    return Err(usage_error("changelog takes a single PATH"));
                }
                path = Some(PathBuf::from(other));
                i += 1;
            }
        }
    }

    Ok(ChangelogArgs {
        path: path.ok_or_else(|| usage_error("changelog requires a PATH"))?,
        from: from.ok_or_else(|| usage_error("changelog requires --from VERSION"))?,
        to,
        symbols,
    })
}

fn parse_history(args: &[String]) -> Result<HistoryCommand, CommandError> {
    match args.first().map(String::as_str) {
        Some("show") => {
            let raw = args.get(1).ok_or_else(|| usage_error("history show requires an ID"))?;
            let id = raw
                .parse::<i64>()
                .map_err(|_| usage_error(format!("Invalid scan id: {}", raw)))?;
            if args.len() > 2 {
                return Err(usage_error("history show takes a single ID"));
            }
            Ok(HistoryCommand::Show(id))
        }
        Some("diff") => {
            no_arguments(&args[1..], "history diff")?;
            Ok(HistoryCommand::Diff)
        }
        _ => {
            let mut limit = None;
            let mut i = 0;
            while i < args.len() {
                match args[i].as_str() {
                    "--limit" | "-n" => {
                        let raw = value(args, &mut i, "--limit")?;
                        limit = Some(
                            raw.parse::<u32>()
                                .map_err(|_| usage_error(format!("Invalid limit: {}", raw)))?,
                        );
                    }
                    other => {
                        return Err(usage_error(format!("Unknown argument for history: {}", other)))
                    }
                }
            }
            Ok(HistoryCommand::List { limit })
        }
    }
}

fn parse_watch(args: &[String]) -> Result<Command, CommandError> {
    let mut project = None;
    let mut file = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--project" | "-p" => project = Some(PathBuf::from(value(args, &mut i, "--project")?)),
            "--file" | "-f" => file = Some(PathBuf::from(value(args, &mut i, "--file")?)),
            other => return Err(usage_error(format!("Unknown argument for watch: {}", other))),
        }
    }

    Ok(Command::Watch { project, file })
}

fn single_positional(args: &[String], command: &str, what: &str) -> Result<String, CommandError> {
    match args {
        [one] if !one.starts_with('-') => Ok(one.clone()),
        [] => Err(usage_error(format!("{} requires {}", command, what))),
        _ => Err(usage_error(format!("{} takes a single {}", command, what))),
    }
}

fn no_arguments(args: &[String], command: &str) -> Result<(), CommandError> {
    match args.first() {
        None => Ok(()),
        Some(extra) => Err(usage_error(format!("Unexpected argument for {}: {}", command, extra))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(String::from).collect()
    }

    fn parse(raw: &str) -> Result<Cli, CommandError> {
        parse_args(&args(raw))
    }

    #[test]
    fn test_no_arguments_prints_help() {
        let cli = parse("").unwrap();
        assert_eq!(cli.command, Command::Help);
        assert_eq!(cli.verbosity, 0);
    }

    #[test]
    fn test_global_options() {
        let cli = parse("--config my.toml -vv scan").unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert_eq!(cli.verbosity, 2);
        assert_eq!(cli.command, Command::Scan(ScanArgs::default()));

        assert_eq!(parse("-v -v scan").unwrap().verbosity, 2);
        assert_eq!(parse("-q scan").unwrap().verbosity, -1);
    }

    #[test]
    fn test_scan_options() {
        let cli = parse("scan --file reqs.txt --format JSON --output out/ --no-save --strict").unwrap();
        let Command::Scan(scan) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(scan.file, Some(PathBuf::from("reqs.txt")));
        assert_eq!(scan.report.format, Some(ExportFormat::Json));
        assert_eq!(scan.report.output, Some(PathBuf::from("out/")));
        assert!(scan.no_save);
        assert!(scan.strict);
    }

    #[test]
    fn test_advise_options() {
        let cli = parse(
            "advise --project . --changelogs notes --offline --prereleases --only requests,Flask --only rich",
        )
        .unwrap();
        let Command::Advise(advise) = cli.command else {
            panic!("expected advise");
        };
        assert_eq!(advise.project, Some(PathBuf::from(".")));
        assert_eq!(advise.changelogs, Some(PathBuf::from("notes")));
        assert!(advise.offline);
        assert!(advise.prereleases);
        assert_eq!(advise.only, vec!["requests", "Flask", "rich"]);
        assert_eq!(advise.report.format, None);
    }

    #[test]
    fn test_changelog_command() {
        let cli = parse("changelog CHANGES.md --from 1.0 --to 2.0 --symbols get,Session").unwrap();
        assert_eq!(
            cli.command,
            Command::Changelog(ChangelogArgs {
                path: PathBuf::from("CHANGES.md"),
                from: "1.0".to_string(),
                to: Some("2.0".to_string()),
                symbols: vec!["get".to_string(), "Session".to_string()],
            })
        );

        assert!(matches!(parse("changelog CHANGES.md"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("changelog --from 1.0"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_history_commands() {
        assert_eq!(
            parse("history").unwrap().command,
            Command::History(HistoryCommand::List { limit: None })
        );
        assert_eq!(
            parse("history --limit 5").unwrap().command,
            Command::History(HistoryCommand::List { limit: Some(5) })
        );
        assert_eq!(
            parse("history show 12").unwrap().command,
            Command::History(HistoryCommand::Show(12))
        );
        assert_eq!(parse("history diff").unwrap().command, Command::History(HistoryCommand::Diff));
        assert!(matches!(parse("history show abc"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_pip_commands() {
        assert_eq!(
            parse("install requests==2.31.0").unwrap().command,
            Command::Install("requests==2.31.0".to_string())
        );
        assert_eq!(parse("uninstall rich").unwrap().command, Command::Uninstall("rich".to_string()));
        assert_eq!(parse("update rich").unwrap().command, Command::Update("rich".to_string()));
        assert_eq!(parse("update-all").unwrap().command, Command::UpdateAll);
        assert!(matches!(parse("install"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("install a b"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_usage_errors() {
        assert!(matches!(parse("frobnicate"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("scan --format xml"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("scan --file"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("--bogus scan"), Err(CommandError::Usage(_))));
    }
}
