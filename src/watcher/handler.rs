//! File change event handlers
//!
//! Processes notify events and converts them to WatchEvents

use std::path::Path;

use notify::{Event, EventKind};

use super::WatchEvent;

/// Manifest file names that affect the dependency set
const MANIFEST_FILES: &[&str] = &[
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "Pipfile.lock",
    "poetry.lock",
];

/// Handle a file system event
pub fn handle_event(event: Event) -> Option<WatchEvent> {
    let path = event.paths.iter().find(|p| is_manifest_file(p))?;

    match event.kind {
        EventKind::Create(_) => Some(WatchEvent::ManifestCreated {
            path: path.to_path_buf(),
        }),
        EventKind::Modify(_) => Some(WatchEvent::ManifestChanged {
            path: path.to_path_buf(),
        }),
        EventKind::Remove(_) => Some(WatchEvent::ManifestRemoved {
            path: path.to_path_buf(),
        }),
        _ => None,
    }
}

/// Check if a path names a dependency manifest
pub fn is_manifest_file(path: &Path) -> bool {
    if is_ignored_location(path) {
        return false;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    if MANIFEST_FILES.contains(&name) {
        return true;
    }

    if name.ends_with(".txt") {
        // requirements*.txt, or anything under a requirements/ directory
        if name.starts_with("requirements") {
            return true;
        }
        return path
            .parent()
            .and_then(|p| p.file_name())
            .map(|dir| dir == "requirements")
            .unwrap_or(false);
    }

    false
}

/// Virtualenvs and VCS metadata churn constantly and never hold manifests
fn is_ignored_location(path: &Path) -> bool {
    path.components().any(|c| {
        let part = c.as_os_str();
        crate::usage::DEFAULT_EXCLUDES
            .iter()
            .any(|excluded| part == *excluded)
    })
}
