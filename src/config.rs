//! Configuration file support
//!
//! Every section is optional; missing keys fall back to defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::deprecation::DeprecationRules;
use crate::export::ExportFormat;
use crate::registry::DEFAULT_INDEX_URL;
use crate::risk::RiskSettings;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "pydguard.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipSection {
    /// Pip command, e.g. `pip3` or `python -m pip`
    pub executable: String,
}

impl Default for PipSection {
    fn default() -> Self {
        Self {
            executable: "pip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    pub index_url: String,
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub cache_ttl_secs: u64,
    /// Use cached index data only
    pub offline: bool,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            timeout_secs: 15,
            max_concurrent: 8,
            cache_ttl_secs: 6 * 60 * 60,
            offline: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Overrides the per-user data directory
    pub path: Option<PathBuf>,
    pub enabled: bool,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub format: ExportFormat,
    /// Directory for timestamped report files; stdout when unset
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeprecationSection {
    /// Extra or overriding minimum supported versions
    pub minimum_versions: BTreeMap<String, String>,
    /// Replaces the built-in name keywords when non-empty
    pub name_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UsageSection {
    /// Extra directory names skipped by the import scan
    pub exclude: Vec<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pip: PipSection,
    pub registry: RegistrySection,
    pub database: DatabaseSection,
    pub report: ReportSection,
    pub risk: RiskSettings,
    pub deprecation: DeprecationSection,
    pub usage: UsageSection,
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `pydguard.toml` in the
    /// working directory is used when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let config = match path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pip.executable.trim().is_empty() {
            return Err(ConfigError::Invalid("pip.executable must not be empty".to_string()));
        }
        if self.registry.max_concurrent == 0 {
            return Err(ConfigError::Invalid("registry.max_concurrent must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.risk.unused_factor) {
            return Err(ConfigError::Invalid("risk.unused_factor must be between 0 and 1".to_string()));
        }
        for (name, weight) in [
            ("risk.breaking_weight", self.risk.breaking_weight),
            ("risk.breaking_cap", self.risk.breaking_cap),
            ("risk.symbol_weight", self.risk.symbol_weight),
            ("risk.inactive_penalty", self.risk.inactive_penalty),
        ] {
            if weight < 0.0 {
                return Err(ConfigError::Invalid(format!("{} must not be negative", name)));
            }
        }
        Ok(())
    }

    /// Built-in deprecation rules with the configured overrides applied
    pub fn deprecation_rules(&self) -> DeprecationRules {
        DeprecationRules::default()
            .with_minimum_versions(self.deprecation.minimum_versions.iter())
            .with_name_keywords(&self.deprecation.name_keywords)
    }

    /// History database location
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(crate::db::default_db_path)
    }
}
