//! Pip command runner

use std::process::{Command, Output};

use serde::Serialize;

use crate::models::dependency::Dependency;
use crate::parser::parse_pip_freeze;

use super::PipError;

/// Result of upgrading every installed package
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateAllOutcome {
    pub updated: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl UpdateAllOutcome {
    /// True when every package was updated
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs pip as a subprocess
#[derive(Debug, Clone)]
pub struct PipRunner {
    program: String,
    base_args: Vec<String>,
}

impl Default for PipRunner {
    fn default() -> Self {
        Self {
            program: "pip".to_string(),
            base_args: Vec::new(),
        }
    }
}

impl PipRunner {
    /// Create a runner from a command line such as `pip` or `python3 -m pip`
    pub fn new(executable: &str) -> Self {
        let mut parts = executable.split_whitespace().map(|s| s.to_string());
        match parts.next() {
            Some(program) => Self {
                program,
                base_args: parts.collect(),
            },
            None => Self::default(),
        }
    }

    /// Full command line for the given pip arguments
    pub fn command_line(&self, args: &[&str]) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.base_args.iter().cloned());
        parts.extend(args.iter().map(|a| a.to_string()));
        parts.join(" ")
    }

    fn run(&self, args: &[&str]) -> Result<Output, PipError> {
        let command = self.command_line(args);
        tracing::debug!("Running {}", command);

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .output()
            .map_err(|source| PipError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PipError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }

    /// Execute `pip freeze` and return its output lines
    pub fn freeze(&self) -> Result<Vec<String>, PipError> {
        let output = self.run(&["freeze"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        Ok(stdout.trim().split('\n').map(|l| l.to_string()).collect())
    }

    /// Installed packages as reported by `pip freeze`
    pub fn installed_packages(&self) -> Result<Vec<Dependency>, PipError> {
        let lines = self.freeze()?;
        Ok(parse_pip_freeze(&lines))
    }

    /// Install a package, e.g. `requests==2.25.1`
    pub fn install(&self, package_spec: &str) -> Result<(), PipError> {
        let spec = package_spec.trim();
        if spec.is_empty() || spec.starts_with('-') {
            return Err(PipError::InvalidSpec(package_spec.to_string()));
        }

        match self.run(&["install", spec]) {
            Ok(_) => {
                tracing::info!("Successfully installed: {}", spec);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to install {}: {}", spec, e);
                Err(e)
            }
        }
    }

    /// Uninstall a package without prompting
    pub fn uninstall(&self, package_name: &str) -> Result<(), PipError> {
        let name = validate_name(package_name)?;

        match self.run(&["uninstall", name, "-y"]) {
            Ok(_) => {
                tracing::info!("Successfully uninstalled: {}", name);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to uninstall {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Upgrade a package to its latest version
    pub fn update(&self, package_name: &str) -> Result<(), PipError> {
        let name = validate_name(package_name)?;

        match self.run(&["install", "--upgrade", name]) {
            Ok(_) => {
                tracing::info!("Updated: {}", name);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to update {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Upgrade every installed package, continuing past failures
    pub fn update_all(&self) -> Result<UpdateAllOutcome, PipError> {
        let packages = self.installed_packages()?;
        let mut outcome = UpdateAllOutcome::default();

        for package in packages {
            match self.update(&package.name) {
                Ok(()) => outcome.updated.push(package.name),
                Err(e) => outcome.failed.push((package.name, e.to_string())),
            }
        }

        if outcome.all_succeeded() {
            tracing::info!("All packages updated successfully");
        } else {
            tracing::warn!("Some packages failed to update: {}", outcome.failed.len());
        }

        Ok(outcome)
    }
}

fn validate_name(name: &str) -> Result<&str, PipError> {
    let name = name.trim();
    if name.is_empty() || name.starts_with('-') || name.contains(char::is_whitespace) {
        return Err(PipError::InvalidSpec(name.to_string()));
    }
    Ok(name)
}
