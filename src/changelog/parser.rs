//! Changelog section parser
//!
//! Recognizes the common release-heading styles found in Python projects:
//! Markdown headings, reStructuredText titles and bare version lines.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parser::version::Version;

lazy_static! {
    /// First version-looking token in a heading (requires at least X.Y)
    static ref VERSION_RE: Regex = Regex::new(
        r"(?i)\bv?(\d+(?:\.\d+)+(?:[._-]?(?:alpha|beta|rc|a|b|c|dev|post)\d*)*)"
    )
    .expect("valid version regex");

    /// "Version 3" / "Release 2.1" at the start of a line
    static ref PREFIXED_RE: Regex = Regex::new(
        r"(?i)^(?:version|release)\s+v?(\d+(?:\.\d+)*(?:[._-]?(?:alpha|beta|rc|a|b|c|dev|post)\d*)*)(?:\s*(?:\(.*\)|[-:].*))?\s*$"
    )
    .expect("valid prefixed version regex");

    /// A line holding only a version with an optional date suffix
    static ref BARE_RE: Regex = Regex::new(
        r"(?i)^\[?v?(\d+(?:\.\d+)+(?:[._-]?(?:alpha|beta|rc|a|b|c|dev|post)\d*)*)\]?(?:\s*(?:\(.*\)|[-:].*))?\s*$"
    )
    .expect("valid bare version regex");

    static ref DATE_RE: Regex = Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("valid date regex");

    static ref BULLET_RE: Regex = Regex::new(r"^(?:[-*+•]|\d+[.)])\s+").expect("valid bullet regex");
}

/// Release notes for one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogSection {
    pub version: String,
    pub date: Option<String>,
    pub entries: Vec<String>,
}

impl ChangelogSection {
    fn new(version: String, heading: &str) -> Self {
        Self {
            version,
            date: DATE_RE.captures(heading).map(|c| c[1].to_string()),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Level {
    /// Markdown `#` heading with its depth
    Atx(usize),
    /// Title underlined with the given character
    Underline(char),
    /// Bare version line
    Plain,
}

impl Level {
    /// True when a heading at `self` ends a release opened at `release`
    fn closes(self, release: Level) -> bool {
        match (release, self) {
            (Level::Atx(open), Level::Atx(other)) => other <= open,
            (Level::Underline(open), Level::Underline(other)) => other == open,
            _ => true,
        }
    }
}

enum Line<'a> {
    /// Heading that names a version
    Release(String, Level),
    /// Heading without a version ("Unreleased", "Bug fixes", ...)
    OtherHeading(Level),
    /// RST underline or overline
    Rule,
    Blank,
    Text(&'a str),
}

/// Parse changelog text into sections, in document order
pub fn parse_changelog(text: &str) -> Vec<ChangelogSection> {
    let lines: Vec<&str> = text.lines().collect();
    let mut sections: Vec<ChangelogSection> = Vec::new();
    let mut current: Option<(ChangelogSection, Level)> = None;

    for (i, raw) in lines.iter().enumerate() {
        let next = lines.get(i + 1).copied();

        match classify(raw, next) {
            Line::Release(version, level) => {
                if let Some((section, _)) = current.take() {
                    sections.push(section);
                }
                current = Some((ChangelogSection::new(version, raw), level));
            }
            Line::OtherHeading(level) => {
                if current.as_ref().map(|(_, open)| level.closes(*open)).unwrap_or(false) {
                    if let Some((section, _)) = current.take() {
                        sections.push(section);
                    }
                }
            }
            Line::Rule | Line::Blank => {}
            Line::Text(content) => {
                let Some((section, _)) = current.as_mut() else {
                    continue;
                };
                let is_bullet = BULLET_RE.is_match(content);
                let continues = !is_bullet && raw.starts_with(|c: char| c == ' ' || c == '\t');
                let entry = BULLET_RE.replace(content, "").trim().to_string();

                match section.entries.last_mut() {
                    Some(last) if continues => {
                        last.push(' ');
                        last.push_str(&entry);
                    }
                    _ => section.entries.push(entry),
                }
            }
        }
    }

    if let Some((section, _)) = current {
        sections.push(section);
    }

    tracing::debug!("Parsed {} changelog sections", sections.len());
    sections
}

fn classify<'a>(raw: &'a str, next: Option<&str>) -> Line<'a> {
    let line = raw.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if is_rule(line) {
        return Line::Rule;
    }

    // Markdown ATX heading
    if line.starts_with('#') {
        let content = line.trim_start_matches('#');
        let level = Level::Atx(line.len() - content.len());
        return match heading_version(content.trim()) {
            Some(version) => Line::Release(version, level),
            None => Line::OtherHeading(level),
        };
    }

    // reStructuredText / setext title
    if let Some(underline) = next.map(str::trim).filter(|n| is_rule(n)) {
        let level = Level::Underline(underline.chars().next().unwrap_or('='));
        return match heading_version(line) {
            Some(version) => Line::Release(version, level),
            None => Line::OtherHeading(level),
        };
    }

    if !BULLET_RE.is_match(line) {
        if let Some(caps) = PREFIXED_RE.captures(line).or_else(|| BARE_RE.captures(line)) {
            return Line::Release(caps[1].to_string(), Level::Plain);
        }
    }

    Line::Text(line)
}

fn heading_version(content: &str) -> Option<String> {
    PREFIXED_RE
        .captures(content)
        .or_else(|| VERSION_RE.captures(content))
        .map(|caps| caps[1].to_string())
}

fn is_rule(line: &str) -> bool {
    let mut chars = line.chars();
    match chars.next() {
        Some(first) if "=-~^*+#".contains(first) => {
            line.len() >= 3 && chars.all(|c| c == first)
        }
        _ => false,
    }
}

/// Sections with `from < version <= to`, in document order
///
/// `to = None` keeps everything newer than `from`. Sections whose version
/// cannot be parsed are skipped.
pub fn sections_between<'a>(
    sections: &'a [ChangelogSection],
    from: &Version,
    to: Option<&Version>,
) -> Vec<&'a ChangelogSection> {
    sections
        .iter()
        .filter(|section| match Version::parse(&section.version) {
            Ok(v) => v > *from && to.map(|t| v <= *t).unwrap_or(true),
            Err(_) => false,
        })
        .collect()
}
