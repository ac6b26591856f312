//! `pip freeze` output parser

use std::path::Path;

use crate::models::dependency::Dependency;

use super::ParserResult;

/// Parse `pip freeze` lines into pinned dependencies
///
/// Only `name==version` lines are kept. Editable installs, direct URL
/// references (`pkg @ file:///...`) and comments carry no `==` and are
/// skipped. The line is split on the first `==` only.
pub fn parse_pip_freeze<S: AsRef<str>>(lines: &[S]) -> Vec<Dependency> {
    lines
        .iter()
        .filter_map(|line| parse_freeze_line(line.as_ref()))
        .collect()
}

/// Parse a single freeze line
pub fn parse_freeze_line(line: &str) -> Option<Dependency> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (name, version) = line.split_once("==")?;
    Some(Dependency::new(name.trim(), version.trim()))
}

/// Read a freeze-style file from disk
pub fn read_freeze_file<P: AsRef<Path>>(path: P) -> ParserResult<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();
    Ok(parse_pip_freeze(&lines))
}
