//! Finds mutation sites across a project and applies an operator to one of them.

use std::collections::BTreeMap;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tree_sitter::Tree;

use crate::copy_tree::{self, ExcludeSet};
use crate::error::{MutationApplyError, ParseError, RunError};
use crate::mutants::{Mutant, MutationSite};
use crate::operators::{self, OperatorId};
use crate::syntax::{self, SyntaxPass};

/// A parsed source file. Immutable once loaded.
pub struct SourceFile {
    /// Relative to the project root.
    pub path: Utf8PathBuf,
    pub text: String,
    pub tree: Tree,
    pub pass: &'static dyn SyntaxPass,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("path", &self.path)
            .field("language", &self.pass.name())
            .finish()
    }
}

impl SourceFile {
    pub fn from_text(
        path: impl Into<Utf8PathBuf>,
        text: impl Into<String>,
        pass: &'static dyn SyntaxPass,
    ) -> Result<Self, ParseError> {
        let path = path.into();
        let text = text.into();
        let tree = pass.parse(&text).map_err(|detail| ParseError::Syntax {
            path: path.clone(),
            language: pass.name(),
            detail,
        })?;
        Ok(Self { path, text, tree, pass })
    }

    pub fn load(
        root: &Path,
        rel: &Utf8Path,
        pass: &'static dyn SyntaxPass,
    ) -> Result<Self, ParseError> {
        let bytes = std::fs::read(root.join(rel.as_std_path())).map_err(|source| {
            ParseError::Read {
                path: rel.to_path_buf(),
                source,
            }
        })?;
        let text = String::from_utf8(bytes).map_err(|_| ParseError::Encoding {
            path: rel.to_path_buf(),
        })?;
        Self::from_text(rel, text, pass)
    }
}

/// Result of scanning a project.
#[derive(Debug, Default)]
pub struct Scan {
    pub files: BTreeMap<Utf8PathBuf, SourceFile>,
    pub sites: Vec<MutationSite>,
    /// Files that could not be parsed and contribute no sites.
    pub skipped: Vec<Utf8PathBuf>,
}

pub struct ScanOptions<'a> {
    pub excludes: &'a ExcludeSet,
    pub passes: &'a [&'static dyn SyntaxPass],
    pub operators: &'a [OperatorId],
    pub mutate_tests: bool,
}

/// Sites for one file, sorted, at most one per `(line, column)`.
pub fn discover_sites(file: &SourceFile, enabled: &[OperatorId]) -> Vec<MutationSite> {
    let mut by_position: BTreeMap<(usize, usize), OperatorId> = BTreeMap::new();
    for shape in syntax::shapes(file.pass, &file.tree, &file.text) {
        let Some(op) = operators::select(&shape, enabled) else {
            continue;
        };
        let at = shape.anchor().start_position();
        by_position.entry((at.row + 1, at.column + 1)).or_insert(op);
    }
    by_position
        .into_iter()
        .map(|((line, column), operator)| MutationSite {
            file: file.path.clone(),
            line,
            column,
            operator,
        })
        .collect()
}

pub fn scan_project(root: &Path, options: &ScanOptions) -> Result<Scan, RunError> {
    let candidates = copy_tree::list_files(root, options.excludes).map_err(|source| {
        RunError::Scan {
            root: root.to_path_buf(),
            source,
        }
    })?;

    let mut scan = Scan::default();
    for rel in candidates {
        let Some(pass) = options.passes.iter().copied().find(|p| p.handles(&rel)) else {
            continue;
        };
        if !options.mutate_tests && pass.is_test_file(&rel) {
            tracing::debug!(file = %rel, "skipping test file");
            continue;
        }
        match SourceFile::load(root, &rel, pass) {
            Ok(file) => {
                let sites = discover_sites(&file, options.operators);
                tracing::debug!(file = %rel, sites = sites.len(), "scanned");
                scan.sites.extend(sites);
                scan.files.insert(rel, file);
            }
            Err(e) => {
                tracing::warn!("skipping {}: {}", rel, e);
                scan.skipped.push(rel);
            }
        }
    }
    scan.sites.sort();
    Ok(scan)
}

/// Apply `site.operator` to the node anchored exactly at the site's position.
pub fn mutate(file: &SourceFile, site: &MutationSite) -> Result<Mutant, MutationApplyError> {
    let shape = syntax::shapes(file.pass, &file.tree, &file.text)
        .into_iter()
        .find(|shape| {
            let at = shape.anchor().start_position();
            at.row + 1 == site.line && at.column + 1 == site.column
        })
        .ok_or_else(|| MutationApplyError::NodeNotFound { site: site.id() })?;

    let edit = operators::edit_for(site.operator, &shape, &file.text, file.pass).ok_or_else(
        || MutationApplyError::OperatorMismatch {
            site: site.id(),
            operator: site.operator.to_string(),
        },
    )?;

    Ok(Mutant {
        site: site.clone(),
        mutated_text: operators::splice(&file.text, &edit),
        original: edit.original,
        replacement: edit.replacement,
    })
}
