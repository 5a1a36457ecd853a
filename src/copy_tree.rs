use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;

use crate::error::ConfigError;

/// Directory and file names never scanned or copied: VCS metadata,
/// virtualenvs, tool caches and build output.
const SKIP_NAMES: &[&str] = &[
    ".git", ".hg", ".svn",
    ".venv", "venv", ".tox", ".nox",
    "__pycache__", ".mypy_cache", ".pytest_cache", ".ruff_cache", ".hypothesis",
    "node_modules", "target", "dist", "build", "htmlcov",
];

const SKIP_SUFFIXES: &[&str] = &[".pyc", ".pyo"];

/// Paths pruned from both scanning and sandbox copies.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| {
                    ConfigError::Invalid(format!("bad exclude pattern '{}': {}", p.as_ref(), e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// `rel` is relative to the project root.
    pub fn is_excluded(&self, rel: &Utf8Path) -> bool {
        let name = rel.file_name().unwrap_or(rel.as_str());
        if SKIP_NAMES.contains(&name) || SKIP_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            return true;
        }
        self.patterns
            .iter()
            .any(|p| p.matches(rel.as_str()) || p.matches(name))
    }
}

fn copy_dir_filtered(
    src: &Path,
    dst: &Path,
    rel: &Utf8Path,
    excludes: &ExcludeSet,
) -> std::io::Result<u64> {
    fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            tracing::warn!(path = %entry.path().display(), "not copying non UTF-8 path");
            continue;
        };
        let child_rel = rel.join(name);
        if excludes.is_excluded(&child_rel) {
            continue;
        }
        let file_type = entry.file_type()?;
        let target = dst.join(name);
        if file_type.is_dir() {
            copied += copy_dir_filtered(&entry.path(), &target, &child_rel, excludes)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
        // symlinks are not followed
    }
    Ok(copied)
}

/// Copy the project tree into `dest_root`, returning the number of files copied.
pub fn copy_tree(project_root: &Path, dest_root: &Path, excludes: &ExcludeSet) -> std::io::Result<u64> {
    copy_dir_filtered(project_root, dest_root, Utf8Path::new(""), excludes)
}

/// Relative paths of all regular files under `root` that survive `excludes`
/// and contain no hidden component, sorted.
///
/// Only an unreadable `root` is an error. Entries below it that cannot be read
/// are skipped with a warning.
pub fn list_files(root: &Path, excludes: &ExcludeSet) -> std::io::Result<Vec<Utf8PathBuf>> {
    let mut found = Vec::new();
    walk(fs::read_dir(root)?, Utf8Path::new(""), excludes, &mut found);
    found.sort();
    Ok(found)
}

fn walk(
    entries: fs::ReadDir,
    rel: &Utf8Path,
    excludes: &ExcludeSet,
    found: &mut Vec<Utf8PathBuf>,
) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %rel, "skipping unreadable entry: {}", e);
                continue;
            }
        };
        let name = entry.file_name();
        let Some(name_str) = name.to_str() else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 path");
            continue;
        };
        if name_str.starts_with('.') {
            continue;
        }
        let rel_path = rel.join(name_str);
        if excludes.is_excluded(&rel_path) {
            continue;
        }
        let ft = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                tracing::warn!(path = %rel_path, "skipping: {}", e);
                continue;
            }
        };
        if ft.is_dir() {
            match fs::read_dir(entry.path()) {
                Ok(children) => walk(children, &rel_path, excludes, found),
                Err(e) => tracing::warn!(path = %rel_path, "skipping unreadable directory: {}", e),
            }
        } else if ft.is_file() {
            found.push(rel_path);
        }
    }
}
