//! Project-wide import scan

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::imports::{attribute_accesses, import_names_for, parse_imports};
use super::{UsageError, DEFAULT_EXCLUDES};

/// How one top-level module is used across the project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleUsage {
    pub module: String,
    /// Full dotted paths imported (`google.protobuf.json_format`, ...)
    pub paths: BTreeSet<String>,
    pub files: BTreeSet<PathBuf>,
    /// Imported names and attribute accesses
    pub symbols: BTreeSet<String>,
}

/// Usage of one dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub import_name: String,
    pub files: Vec<PathBuf>,
    pub symbols: Vec<String>,
}

/// Result of scanning a project tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectUsage {
    pub root: PathBuf,
    pub files_scanned: usize,
    pub modules: BTreeMap<String, ModuleUsage>,
}

impl ProjectUsage {
    /// Record the imports of one source file
    pub fn add_source(&mut self, file: &Path, source: &str) {
        let imports = parse_imports(source);
        let mut bindings: BTreeMap<String, String> = BTreeMap::new();

        for import in &imports {
            let top = import.top_level().to_string();
            let entry = self.modules.entry(top.clone()).or_insert_with(|| ModuleUsage {
                module: top.clone(),
                ..Default::default()
            });
            entry.paths.insert(import.module.clone());
            entry.files.insert(file.to_path_buf());
            entry.symbols.extend(import.names.iter().cloned());

            for binding in &import.bindings {
                bindings.insert(binding.clone(), top.clone());
            }
        }

        let names: Vec<String> = bindings.keys().cloned().collect();
        for (binding, attr) in attribute_accesses(source, &names) {
            if let Some(usage) = bindings.get(&binding).and_then(|top| self.modules.get_mut(top)) {
                usage.symbols.insert(attr);
            }
        }

        self.files_scanned += 1;
    }

    /// Usage report for a distribution, `None` when it is never imported
    pub fn for_dependency(&self, name: &str) -> Option<UsageReport> {
        import_names_for(name).into_iter().find_map(|candidate| {
            let top = candidate.split('.').next().unwrap_or(&candidate);
            let usage = self.modules.get(top)?;

            let imported = !candidate.contains('.')
                || usage
                    .paths
                    .iter()
                    .any(|p| p == &candidate || p.starts_with(&format!("{}.", candidate)));
            if !imported {
                return None;
            }

            Some(UsageReport {
                import_name: candidate.clone(),
                files: usage.files.iter().cloned().collect(),
                symbols: usage.symbols.iter().cloned().collect(),
            })
        })
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

/// Scan every `*.py` file under `root`
///
/// Directories named in `DEFAULT_EXCLUDES` or `extra_excludes` are skipped.
/// Unreadable files are logged and skipped.
pub fn scan_project<P: AsRef<Path>>(
    root: P,
    extra_excludes: &[String],
) -> Result<ProjectUsage, UsageError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(UsageError::NotADirectory(root.display().to_string()));
    }

    let pattern = format!(
        "{}/**/*.py",
        glob::Pattern::escape(&root.to_string_lossy())
    );

    let mut usage = ProjectUsage {
        root: root.to_path_buf(),
        ..Default::default()
    };

    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        if is_excluded(root, &path, extra_excludes) {
            continue;
        }

        match std::fs::read_to_string(&path) {
            Ok(source) => {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                usage.add_source(relative, &source);
            }
            Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
        }
    }

    tracing::info!(
        "Scanned {} Python files under {} ({} modules imported)",
        usage.files_scanned,
        root.display(),
        usage.module_count()
    );

    Ok(usage)
}

fn is_excluded(root: &Path, path: &Path, extra: &[String]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        DEFAULT_EXCLUDES.contains(&name.as_ref()) || extra.iter().any(|e| e == name.as_ref())
    })
}
