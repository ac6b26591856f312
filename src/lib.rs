//! PyDGuard - dependency analyzer and upgrade advisor
//!
//! This library provides everything behind the `pydguard` binary:
//! - `pip freeze` / requirements parsing and PEP 440 versions
//! - Deprecation detection against a minimum-version table
//! - Package index lookups with a SQLite release cache
//! - Changelog parsing and breaking-change detection
//! - Project import scanning and upgrade risk scoring
//! - Text, JSON and CSV reports and a local scan history

pub mod advisor;
pub mod changelog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod deprecation;
pub mod export;
pub mod models;
pub mod parser;
pub mod registry;
pub mod risk;
pub mod scanner;
pub mod usage;
pub mod watcher;

use tracing_subscriber::EnvFilter;

pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
/// `scan --strict` found deprecated packages
pub const EXIT_DEPRECATED: i32 = 3;

/// Error type for commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Parser error: {0}")]
    Parser(#[from] parser::ParserError),

    #[error(transparent)]
    Version(#[from] parser::VersionError),

    #[error("Pip error: {0}")]
    Pip(#[from] scanner::PipError),

    #[error("Registry error: {0}")]
    Registry(#[from] registry::RegistryError),

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Project scan error: {0}")]
    ProjectScan(#[from] usage::UsageError),

    #[error("Watcher error: {0}")]
    Watcher(#[from] watcher::WatcherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Usage(_) => EXIT_USAGE,
            _ => EXIT_ERROR,
        }
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins when set. Otherwise `-q` shows errors only, the default
/// shows warnings, `-v` info and `-vv` debug. Logs go to stderr so reports
/// on stdout stay clean.
pub fn init_logging(verbosity: i8) {
    let level = match verbosity {
        i8::MIN..=-1 => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse arguments, run the command and return the process exit code
pub async fn run(args: Vec<String>) -> i32 {
    let cli = match cli::parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Run 'pydguard help' for usage.");
            return e.exit_code();
        }
    };

    init_logging(cli.verbosity);
    tracing::debug!("Starting pydguard {}", env!("CARGO_PKG_VERSION"));

    match commands::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandError::Usage("bad".to_string()).exit_code(), EXIT_USAGE);
        assert_eq!(CommandError::Internal("boom".to_string()).exit_code(), EXIT_ERROR);
        assert_eq!(
            CommandError::from(scanner::PipError::InvalidSpec("".to_string())).exit_code(),
            EXIT_ERROR
        );
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_command() {
        assert_eq!(run(vec!["frobnicate".to_string()]).await, EXIT_USAGE);
    }

    #[tokio::test]
    async fn test_run_help() {
        assert_eq!(run(vec!["help".to_string()]).await, EXIT_OK);
    }
}
