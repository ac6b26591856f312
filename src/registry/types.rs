//! Release metadata types
//!
//! Converts the PyPI JSON API document into the subset used for advice.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parser::version::Version;

use super::RegistryError;

/// Release metadata for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub name: String,
    /// Version the index reports as current (`info.version`)
    pub latest_version: String,
    /// Highest non-yanked final release
    pub latest_stable: Option<String>,
    /// Highest non-yanked release including pre-releases
    pub newest_version: Option<String>,
    /// All parseable versions, ascending
    pub versions: Vec<String>,
    /// Versions whose files are all yanked
    pub yanked: Vec<String>,
    pub requires_python: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub changelog_url: Option<String>,
    pub home_page: Option<String>,
    /// Upload time of the latest stable release
    pub latest_release_date: Option<String>,
    /// Classifier `Development Status :: 7 - Inactive`
    pub inactive: bool,
}

impl ReleaseInfo {
    /// Build from a PyPI `/{name}/json` document
    pub fn from_json(name: &str, value: &Value) -> Result<Self, RegistryError> {
        let info = value
            .get("info")
            .and_then(|i| i.as_object())
            .ok_or_else(|| RegistryError::InvalidResponse(format!("{}: missing 'info'", name)))?;

        let latest_version = info
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                RegistryError::InvalidResponse(format!("{}: missing 'info.version'", name))
            })?
            .to_string();

        let text = |key: &str| -> Option<String> {
            info.get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.trim())
                .filter(|s| !s.is_empty() && *s != "UNKNOWN")
                .map(|s| s.to_string())
        };

        let mut parsed: Vec<(Version, bool, Option<String>)> = Vec::new();
        let mut yanked = Vec::new();

        if let Some(releases) = value.get("releases").and_then(|r| r.as_object()) {
            for (version_str, files) in releases {
                let version = match Version::parse(version_str) {
                    Ok(v) => v,
                    Err(_) => {
                        tracing::debug!("Skipping unparseable release {} {}", name, version_str);
                        continue;
                    }
                };

                let files = files.as_array().map(|f| f.as_slice()).unwrap_or(&[]);
                let all_yanked = !files.is_empty()
                    && files
                        .iter()
                        .all(|f| f.get("yanked").and_then(|y| y.as_bool()).unwrap_or(false));
                if all_yanked {
                    yanked.push(version_str.clone());
                }

                let upload_time = files
                    .iter()
                    .filter_map(|f| f.get("upload_time_iso_8601").or_else(|| f.get("upload_time")))
                    .filter_map(|t| t.as_str())
                    .min()
                    .map(|t| t.to_string());

                let installable = !files.is_empty() && !all_yanked;
                parsed.push((version, installable, upload_time));
            }
        }

        parsed.sort_by(|a, b| a.0.cmp(&b.0));

        let stable = parsed
            .iter()
            .rev()
            .find(|(v, installable, _)| *installable && !v.is_prerelease());
        let newest = parsed.iter().rev().find(|(_, installable, _)| *installable);

        let changelog_url = info
            .get("project_urls")
            .and_then(|u| u.as_object())
            .and_then(|urls| {
                urls.iter().find_map(|(label, url)| {
                    let label = label.to_lowercase();
                    let is_changelog = ["changelog", "change log", "changes", "release notes", "history", "news"]
                        .iter()
                        .any(|k| label.contains(k));
                    if is_changelog {
                        url.as_str().map(|s| s.to_string())
                    } else {
                        None
                    }
                })
            });

        let inactive = info
            .get("classifiers")
            .and_then(|c| c.as_array())
            .map(|classifiers| {
                classifiers.iter().filter_map(|c| c.as_str()).any(|c| {
                    c.starts_with("Development Status :: 7")
                })
            })
            .unwrap_or(false);

        yanked.sort_by(|a, b| match (Version::parse(a), Version::parse(b)) {
            (Ok(va), Ok(vb)) => va.cmp(&vb),
            _ => a.cmp(b),
        });

        Ok(Self {
            name: info
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or(name)
                .to_string(),
            latest_version,
            latest_stable: stable.map(|(v, _, _)| v.to_string()),
            newest_version: newest.map(|(v, _, _)| v.to_string()),
            versions: parsed.iter().map(|(v, _, _)| v.to_string()).collect(),
            yanked,
            requires_python: text("requires_python"),
            summary: text("summary"),
            description: text("description"),
            changelog_url,
            home_page: text("home_page"),
            latest_release_date: stable.and_then(|(_, _, t)| t.clone()),
            inactive,
        })
    }

    /// Version to recommend as upgrade target
    pub fn target_version(&self, include_prereleases: bool) -> Option<&str> {
        if include_prereleases {
            self.newest_version.as_deref().or(self.latest_stable.as_deref())
        } else {
            self.latest_stable.as_deref()
        }
    }

    /// True when the given version was yanked
    pub fn is_yanked(&self, version: &str) -> bool {
        match Version::parse(version) {
            Ok(v) => self
                .yanked
                .iter()
                .filter_map(|y| Version::parse(y).ok())
                .any(|y| y == v),
            Err(_) => self.yanked.iter().any(|y| y == version),
        }
    }

    /// Number of releases published after the given version
    pub fn releases_behind(&self, version: &str) -> Option<usize> {
        let current = Version::parse(version).ok()?;
        Some(
            self.versions
                .iter()
                .filter_map(|v| Version::parse(v).ok())
                .filter(|v| *v > current && !v.is_prerelease())
                .count(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "info": {
                "name": "Sample-Pkg",
                "version": "2.1.0",
                "summary": "A sample package",
                "requires_python": ">=3.8",
                "home_page": "",
                "description": "# Changelog\n\n## 2.1.0\n- Added things\n",
                "classifiers": [
                    "Programming Language :: Python :: 3",
                    "Development Status :: 5 - Production/Stable"
                ],
                "project_urls": {
                    "Homepage": "https://example.org",
                    "Release Notes": "https://example.org/changes"
                }
            },
            "releases": {
                "1.0.0": [{"yanked": false, "upload_time_iso_8601": "2022-01-01T00:00:00Z"}],
                "1.5.0": [{"yanked": true}, {"yanked": true}],
                "2.0.0": [{"yanked": false, "upload_time_iso_8601": "2023-03-01T00:00:00Z"}],
                "2.1.0": [
                    {"yanked": false, "upload_time_iso_8601": "2024-05-02T10:00:00Z"},
                    {"yanked": false, "upload_time_iso_8601": "2024-05-01T10:00:00Z"}
                ],
                "3.0.0b1": [{"yanked": false}],
                "3.0.0": [],
                "not-a-version": [{"yanked": false}]
            }
        })
    }

    #[test]
    fn test_from_json() {
        let info = ReleaseInfo::from_json("sample-pkg", &sample()).unwrap();

        assert_eq!(info.name, "Sample-Pkg");
        assert_eq!(info.latest_version, "2.1.0");
        assert_eq!(info.latest_stable.as_deref(), Some("2.1.0"));
        assert_eq!(info.newest_version.as_deref(), Some("3.0.0b1"));
        assert_eq!(info.yanked, vec!["1.5.0"]);
        assert_eq!(info.versions, vec!["1.0.0", "1.5.0", "2.0.0", "2.1.0", "3.0.0b1", "3.0.0"]);
        assert_eq!(info.requires_python.as_deref(), Some(">=3.8"));
        assert_eq!(info.home_page, None);
        assert_eq!(info.changelog_url.as_deref(), Some("https://example.org/changes"));
        assert_eq!(info.latest_release_date.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert!(!info.inactive);
    }

    #[test]
    fn test_target_version() {
        let info = ReleaseInfo::from_json("sample-pkg", &sample()).unwrap();
        assert_eq!(info.target_version(false), Some("2.1.0"));
        assert_eq!(info.target_version(true), Some("3.0.0b1"));
    }

    #[test]
    fn test_yanked_and_releases_behind() {
        let info = ReleaseInfo::from_json("sample-pkg", &sample()).unwrap();
        assert!(info.is_yanked("1.5"));
        assert!(!info.is_yanked("2.0.0"));
        // 1.5.0, 2.0.0, 2.1.0, 3.0.0 are newer finals
        assert_eq!(info.releases_behind("1.0.0"), Some(4));
        assert_eq!(info.releases_behind("garbage"), None);
    }

    #[test]
    fn test_inactive_classifier() {
        let mut doc = sample();
        doc["info"]["classifiers"] = json!(["Development Status :: 7 - Inactive"]);
        let info = ReleaseInfo::from_json("sample-pkg", &doc).unwrap();
        assert!(info.inactive);
    }

    #[test]
    fn test_missing_info_is_invalid() {
        let err = ReleaseInfo::from_json("x", &json!({"releases": {}})).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResponse(_)));
    }

    #[test]
    fn test_roundtrip_for_cache() {
        let info = ReleaseInfo::from_json("sample-pkg", &sample()).unwrap();
        let stored = serde_json::to_string(&info).unwrap();
        let restored: ReleaseInfo = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored, info);
    }
}
