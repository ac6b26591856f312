//! Breaking-change detection over changelog entries

use serde::{Deserialize, Serialize};

use super::parser::ChangelogSection;

/// Kind of incompatible change announced by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakingKind {
    Removal,
    Rename,
    DroppedSupport,
    Incompatible,
    Deprecation,
}

impl BreakingKind {
    pub fn label(&self) -> &'static str {
        match self {
            BreakingKind::Removal => "removal",
            BreakingKind::Rename => "rename",
            BreakingKind::DroppedSupport => "dropped support",
            BreakingKind::Incompatible => "incompatible",
            BreakingKind::Deprecation => "deprecation",
        }
    }

    /// Deprecations warn about future breakage; everything else breaks now
    pub fn is_breaking(&self) -> bool {
        !matches!(self, BreakingKind::Deprecation)
    }
}

/// A changelog entry that may break dependent code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingChange {
    pub version: String,
    pub kind: BreakingKind,
    pub text: String,
    /// Project symbols mentioned by the entry
    pub matched_symbols: Vec<String>,
}

const DROPPED_SUPPORT_MARKERS: &[&str] = &[
    "drop support",
    "drops support",
    "dropped support",
    "dropping support",
    "no longer support",
];

const INCOMPATIBLE_MARKERS: &[&str] = &[
    "breaking",
    "backwards incompatible",
    "backward incompatible",
    "backwards-incompatible",
    "backward-incompatible",
    "incompatible change",
    "no longer",
];

/// Classify one entry, `None` when it announces nothing incompatible
pub fn classify_entry(entry: &str) -> Option<BreakingKind> {
    let lowered = entry.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));

    if has(DROPPED_SUPPORT_MARKERS) {
        Some(BreakingKind::DroppedSupport)
    } else if lowered.contains("removed") || lowered.contains("removal of") {
        Some(BreakingKind::Removal)
    } else if lowered.contains("renamed") {
        Some(BreakingKind::Rename)
    } else if has(INCOMPATIBLE_MARKERS) {
        Some(BreakingKind::Incompatible)
    } else if lowered.contains("deprecat") {
        Some(BreakingKind::Deprecation)
    } else {
        None
    }
}

/// Collect breaking entries from the given sections
///
/// Every symbol that appears as a whole word in an entry is recorded in
/// `matched_symbols`.
pub fn detect_breaking_changes<'a, I, S>(sections: I, symbols: &[S]) -> Vec<BreakingChange>
where
    I: IntoIterator<Item = &'a ChangelogSection>,
    S: AsRef<str>,
{
    let mut changes = Vec::new();

    for section in sections {
        for entry in &section.entries {
            let Some(kind) = classify_entry(entry) else {
                continue;
            };

            let mut matched_symbols: Vec<String> = symbols
                .iter()
                .map(|s| s.as_ref())
                .filter(|s| !s.is_empty() && contains_word(entry, s))
                .map(|s| s.to_string())
                .collect();
            matched_symbols.sort();
            matched_symbols.dedup();

            changes.push(BreakingChange {
                version: section.version.clone(),
                kind,
                text: entry.clone(),
                matched_symbols,
            });
        }
    }

    tracing::debug!("Detected {} breaking changelog entries", changes.len());
    changes
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word occurrence of `word` in `text`
fn contains_word(text: &str, word: &str) -> bool {
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.map(is_word_char).unwrap_or(false) && !after.map(is_word_char).unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(version: &str, entries: &[&str]) -> ChangelogSection {
        ChangelogSection {
            version: version.to_string(),
            date: None,
            entries: entries.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_classify_entry() {
        assert_eq!(classify_entry("Removed the `legacy` module"), Some(BreakingKind::Removal));
        assert_eq!(classify_entry("Renamed `foo` to `bar`"), Some(BreakingKind::Rename));
        assert_eq!(
            classify_entry("Dropped support for Python 3.7"),
            Some(BreakingKind::DroppedSupport)
        );
        assert_eq!(
            classify_entry("We no longer support Windows 7"),
            Some(BreakingKind::DroppedSupport)
        );
        assert_eq!(
            classify_entry("BREAKING: config is now strict"),
            Some(BreakingKind::Incompatible)
        );
        assert_eq!(
            classify_entry("Backward-incompatible change to parse()"),
            Some(BreakingKind::Incompatible)
        );
        assert_eq!(
            classify_entry("`load()` is no longer lazy"),
            Some(BreakingKind::Incompatible)
        );
        assert_eq!(
            classify_entry("Deprecated `Client.old_call`"),
            Some(BreakingKind::Deprecation)
        );
        assert_eq!(classify_entry("Added retries"), None);
    }

    #[test]
    fn test_removal_wins_over_deprecation() {
        assert_eq!(
            classify_entry("Removed deprecated `helpers` module"),
            Some(BreakingKind::Removal)
        );
    }

    #[test]
    fn test_detect_with_symbols() {
        let sections = vec![
            section("2.0.0", &["Removed `Session.get_json`", "Added `Session.json`"]),
            section("1.9.0", &["Renamed `fetch` to `fetch_one`", "Fixed typo"]),
        ];
        let symbols = vec!["Session".to_string(), "fetch".to_string(), "json".to_string()];

        let changes = detect_breaking_changes(&sections, &symbols);
        assert_eq!(changes.len(), 2);

        assert_eq!(changes[0].version, "2.0.0");
        assert_eq!(changes[0].kind, BreakingKind::Removal);
        // "get_json" does not match "json" as a whole word
        assert_eq!(changes[0].matched_symbols, vec!["Session"]);

        assert_eq!(changes[1].kind, BreakingKind::Rename);
        assert_eq!(changes[1].matched_symbols, vec!["fetch"]);
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("call foo() now", "foo"));
        assert!(contains_word("`foo`", "foo"));
        assert!(contains_word("np.array removed", "array"));
        assert!(!contains_word("foobar", "foo"));
        assert!(!contains_word("my_foo", "foo"));
        assert!(contains_word("foobar foo", "foo"));
    }

    #[test]
    fn test_no_symbols() {
        let sections = vec![section("1.0", &["Breaking: everything"])];
        let changes = detect_breaking_changes(&sections, &[] as &[&str]);
        assert_eq!(changes.len(), 1);
        assert!(changes[0].matched_symbols.is_empty());
        assert!(changes[0].kind.is_breaking());
    }
}
