//! PEP 440 version handling
//!
//! Parses Python package versions and orders them the way pip does:
//! `1.0.dev1 < 1.0a1 < 1.0rc1 < 1.0 < 1.0.post1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static::lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(
        r"(?ix)^\s*v?
        (?:(?P<epoch>[0-9]+)!)?
        (?P<release>[0-9]+(?:\.[0-9]+)*)
        (?:[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>[0-9]+)?)?
        (?:-(?P<post_n1>[0-9]+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>[0-9]+)?)?
        (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>[0-9]+)?)?
        (?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?
        \s*$"
    )
    .expect("valid PEP 440 pattern");
}

/// Version errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version: {0}")]
    Invalid(String),
}

/// Pre-release phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreKind {
    Alpha,
    Beta,
    ReleaseCandidate,
}

/// Sort key for the pre-release segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    /// Dev-only release (`1.0.dev1`) sorts before any pre-release
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

/// Sort key for the dev segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    NotDev,
}

/// A parsed PEP 440 version
#[derive(Debug, Clone)]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreKind, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<String>,
    raw: String,
}

impl Version {
    /// Parse a version string
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let caps = VERSION_RE
            .captures(s)
            .ok_or_else(|| VersionError::Invalid(s.to_string()))?;

        let number = |name: &str| -> Result<Option<u64>, VersionError> {
            caps.name(name)
                .map(|m| {
                    m.as_str()
                        .parse::<u64>()
                        .map_err(|_| VersionError::Invalid(s.to_string()))
                })
                .transpose()
        };

        let epoch = number("epoch")?.unwrap_or(0);

        let release = caps["release"]
            .split('.')
            .map(|p| p.parse::<u64>().map_err(|_| VersionError::Invalid(s.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let kind = match label.as_str().to_lowercase().as_str() {
                    "a" | "alpha" => PreKind::Alpha,
                    "b" | "beta" => PreKind::Beta,
                    _ => PreKind::ReleaseCandidate,
                };
                Some((kind, number("pre_n")?.unwrap_or(0)))
            }
            None => None,
        };

        let post = if caps.name("post_n1").is_some() {
            number("post_n1")?
        } else if caps.name("post_l").is_some() {
            Some(number("post_n2")?.unwrap_or(0))
        } else {
            None
        };

        let dev = if caps.name("dev_l").is_some() {
            Some(number("dev_n")?.unwrap_or(0))
        } else {
            None
        };

        let local = caps.name("local").map(|m| m.as_str().to_lowercase());

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
            raw: s.trim().to_string(),
        })
    }

    /// True for pre-releases and dev releases
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// First release component
    pub fn major(&self) -> u64 {
        self.release.first().copied().unwrap_or(0)
    }

    /// Second release component (0 when absent)
    pub fn minor(&self) -> u64 {
        self.release.get(1).copied().unwrap_or(0)
    }

    /// Version as originally written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn release_without_trailing_zeros(&self) -> &[u64] {
        let mut end = self.release.len();
        while end > 1 && self.release[end - 1] == 0 {
            end -= 1;
        }
        &self.release[..end]
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (Some((kind, n)), _, _) => PreKey::Pre(kind, n),
            _ => PreKey::Final,
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::NotDev,
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| {
                self.release_without_trailing_zeros()
                    .cmp(other.release_without_trailing_zeros())
            })
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Strictly parse a dotted numeric version (`1.20.0`)
///
/// Returns None when any component is not a plain integer, so
/// `1.0rc1` or `2.0.post1` are rejected.
pub fn parse_strict_release(s: &str) -> Option<Vec<u64>> {
    s.split('.')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect()
}

/// Compare two numeric releases component by component
///
/// A shorter release that is a prefix of the longer one compares lower:
/// `[1, 2] < [1, 2, 0]`.
pub fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    a.cmp(b)
}

/// Size of the jump between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// Target equals current
    None,
    /// Target is older than current
    Downgrade,
    Patch,
    Minor,
    Major,
    /// Target is a pre-release or dev release
    PreRelease,
    /// Current version could not be parsed
    Unknown,
}

impl UpgradeKind {
    /// Classify the move from `current` to `target`
    ///
    /// For `0.x` releases a minor bump is treated as major, since those
    /// series conventionally break compatibility on the second component.
    pub fn between(current: &Version, target: &Version) -> Self {
        match target.cmp(current) {
            Ordering::Equal => Self::None,
            Ordering::Less => Self::Downgrade,
            Ordering::Greater => {
                if target.is_prerelease() {
                    Self::PreRelease
                } else if target.epoch != current.epoch || target.major() != current.major() {
                    Self::Major
                } else if target.minor() != current.minor() {
                    if current.major() == 0 {
                        Self::Major
                    } else {
                        Self::Minor
                    }
                } else {
                    Self::Patch
                }
            }
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Downgrade => "downgrade",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::PreRelease => "pre-release",
            Self::Unknown => "unknown",
        }
    }

    /// True when moving to the target is an actual upgrade
    pub fn is_upgrade(&self) -> bool {
        matches!(
            self,
            Self::Patch | Self::Minor | Self::Major | Self::PreRelease | Self::Unknown
        )
    }
}
