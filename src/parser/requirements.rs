//! Requirements file parser
//!
//! Handles the subset of the pip requirements format that matters for
//! auditing pinned versions: comments, line continuations, option lines,
//! extras, environment markers and version specifiers.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::dependency::Dependency;

use super::{ParserError, ParserResult};

lazy_static::lazy_static! {
    static ref NAME_RE: Regex =
        Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[([^\]]*)\])?\s*(.*)$")
            .expect("valid requirement name pattern");
    static ref SPEC_RE: Regex =
        Regex::new(r"^(===|~=|==|!=|<=|>=|<|>)\s*([^\s,]+)$").expect("valid specifier pattern");
}

/// Version comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "===")]
    ArbitraryEqual,
    #[serde(rename = "~=")]
    Compatible,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">")]
    Greater,
}

impl Operator {
    fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "===" => Some(Self::ArbitraryEqual),
            "~=" => Some(Self::Compatible),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "<=" => Some(Self::LessEqual),
            ">=" => Some(Self::GreaterEqual),
            "<" => Some(Self::Less),
            ">" => Some(Self::Greater),
            _ => None,
        }
    }

    /// Operator as written in a requirement
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::ArbitraryEqual => "===",
            Self::Compatible => "~=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
        }
    }
}

/// A single version specifier, e.g. `>=2.0`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifier {
    pub op: Operator,
    pub version: String,
}

/// A parsed requirement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub specifiers: Vec<Specifier>,
    pub marker: Option<String>,
    /// Direct reference (`name @ url`)
    pub url: Option<String>,
    /// 1-based line number of the first physical line
    pub line: usize,
}

impl Requirement {
    /// The exact pin of this requirement, if it has one
    ///
    /// A requirement is pinned when it carries a single `==` (without
    /// wildcard) or `===` specifier.
    pub fn pinned(&self) -> Option<Dependency> {
        match self.specifiers.as_slice() {
            [spec] if matches!(spec.op, Operator::Equal | Operator::ArbitraryEqual)
                && !spec.version.contains('*') =>
            {
                Some(Dependency::new(self.name.clone(), spec.version.clone()))
            }
            _ => None,
        }
    }

    /// Specifiers rendered back to requirement syntax
    pub fn specifier_string(&self) -> String {
        self.specifiers
            .iter()
            .map(|s| format!("{}{}", s.op.symbol(), s.version))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse requirements file content
pub fn parse_requirements(content: &str) -> ParserResult<Vec<Requirement>> {
    let mut requirements = Vec::new();

    for (line_no, logical) in logical_lines(content) {
        let line = strip_inline_options(strip_comment(&logical)).trim().to_string();

        // Options (-r, -c, -e, --index-url, ...) are not requirements we can audit
        if line.is_empty() || line.starts_with('-') {
            continue;
        }

        requirements.push(parse_requirement_line(&line, line_no)?);
    }

    Ok(requirements)
}

/// Parse a single requirement string
pub fn parse_requirement_line(line: &str, line_no: usize) -> ParserResult<Requirement> {
    let (body, marker) = match line.split_once(';') {
        Some((body, marker)) => (body.trim(), Some(marker.trim().to_string())),
        None => (line.trim(), None),
    };

    let caps = NAME_RE.captures(body).ok_or_else(|| ParserError::InvalidLine {
        line: line_no,
        reason: format!("cannot read a project name from '{}'", body),
    })?;

    let name = caps[1].to_string();
    let extras = caps
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let rest = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");

    let mut requirement = Requirement {
        name,
        extras,
        specifiers: Vec::new(),
        marker: marker.filter(|m| !m.is_empty()),
        url: None,
        line: line_no,
    };

    if rest.is_empty() {
        return Ok(requirement);
    }

    if let Some(url) = rest.strip_prefix('@') {
        requirement.url = Some(url.trim().to_string());
        return Ok(requirement);
    }

    // Legacy parenthesised form: name (>=1.0)
    let rest = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(rest);

    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let spec = SPEC_RE.captures(part).ok_or_else(|| ParserError::InvalidLine {
            line: line_no,
            reason: format!("invalid version specifier '{}'", part),
        })?;
        let op = Operator::from_symbol(&spec[1]).ok_or_else(|| ParserError::InvalidLine {
            line: line_no,
            reason: format!("unknown operator '{}'", &spec[1]),
        })?;
        requirement.specifiers.push(Specifier {
            op,
            version: spec[2].to_string(),
        });
    }

    Ok(requirement)
}

/// Find requirements files in a project directory
///
/// Matches `requirements*.txt` at the top level and any `.txt` inside a
/// `requirements/` directory.
pub fn find_requirement_files<P: AsRef<Path>>(dir: P) -> ParserResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for pattern in ["requirements*.txt", "requirements/*.txt"] {
        let full = dir.join(pattern);
        for entry in glob::glob(&full.to_string_lossy())? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable path: {}", e),
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Join backslash-continued lines, keeping the first line number
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start_line = 0;

    for (idx, raw) in content.lines().enumerate() {
        if current.is_empty() {
            start_line = idx + 1;
        }

        match raw.strip_suffix('\\') {
            Some(continued) => {
                current.push_str(continued);
                current.push(' ');
            }
            None => {
                current.push_str(raw);
                lines.push((start_line, std::mem::take(&mut current)));
            }
        }
    }

    if !current.is_empty() {
        lines.push((start_line, current));
    }

    lines
}

/// Drop per-requirement options such as `--hash=...`
fn strip_inline_options(line: &str) -> &str {
    match line.find(" --") {
        Some(idx) if !line.trim_start().starts_with('-') => &line[..idx],
        _ => line,
    }
}

/// Remove a trailing comment (`#` at line start or after whitespace)
fn strip_comment(line: &str) -> &str {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return "";
    }

    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pinned_requirement() {
        let reqs = parse_requirements("requests==2.31.0\n").unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].name, "requests");
        assert_eq!(reqs[0].pinned(), Some(Dependency::new("requests", "2.31.0")));
    }

    #[test]
    fn test_parse_extras_markers_and_ranges() {
        let content = "uvicorn[standard, http] >=0.20,<1.0 ; python_version >= \"3.8\"\n";
        let reqs = parse_requirements(content).unwrap();

        let req = &reqs[0];
        assert_eq!(req.name, "uvicorn");
        assert_eq!(req.extras, vec!["standard", "http"]);
        assert_eq!(req.specifiers.len(), 2);
        assert_eq!(req.specifiers[0].op, Operator::GreaterEqual);
        assert_eq!(req.specifiers[1].version, "1.0");
        assert_eq!(req.marker.as_deref(), Some("python_version >= \"3.8\""));
        assert!(req.pinned().is_none());
        assert_eq!(req.specifier_string(), ">=0.20,<1.0");
    }

    #[test]
    fn test_skips_comments_and_options() {
        let content = "\
# production deps
-r base.txt
--index-url https://example.org/simple
-e ./local-package

flask==3.0.0  # web framework
";
        let reqs = parse_requirements(content).unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].name, "flask");
        assert_eq!(reqs[0].line, 6);
    }

    #[test]
    fn test_line_continuation() {
        let content = "django==4.2.7 \\\n    --hash=sha256:abc\nclick==8.1.7\n";
        let reqs = parse_requirements(content).unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].line, 1);
        assert_eq!(reqs[1].line, 3);
    }

    #[test]
    fn test_direct_reference() {
        let reqs = parse_requirements("mypkg @ https://example.org/mypkg-1.0.tar.gz\n").unwrap();
        assert_eq!(reqs[0].url.as_deref(), Some("https://example.org/mypkg-1.0.tar.gz"));
        assert!(reqs[0].pinned().is_none());
    }

    #[test]
    fn test_wildcard_is_not_pinned() {
        let reqs = parse_requirements("numpy==1.26.*\n").unwrap();
        assert!(reqs[0].pinned().is_none());
    }

    #[test]
    fn test_arbitrary_equality_is_pinned() {
        let reqs = parse_requirements("legacy===1.0-custom\n").unwrap();
        assert_eq!(reqs[0].pinned(), Some(Dependency::new("legacy", "1.0-custom")));
    }

    #[test]
    fn test_invalid_specifier_reports_line() {
        let err = parse_requirements("ok==1.0\nbroken =>1.0\n").unwrap_err();
        match err {
            ParserError::InvalidLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_requirement_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "a==1\n").unwrap();
        std::fs::write(dir.path().join("requirements-dev.txt"), "b==1\n").unwrap();
        std::fs::create_dir(dir.path().join("requirements")).unwrap();
        std::fs::write(dir.path().join("requirements").join("prod.txt"), "c==1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "nothing").unwrap();

        let files = find_requirement_files(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| !f.ends_with("notes.txt")));
    }
}
