//! Disposable per-mutant copies of the project tree.
//!
//! Every mutant gets a fresh directory that is thrown away as a whole once its
//! test run finishes. The real project is only ever read.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::copy_tree::{self, ExcludeSet};
use crate::error::SandboxError;
use crate::mutants::Mutant;

pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    /// An unmutated copy, used for the baseline run.
    pub fn pristine(
        project_root: &Path,
        excludes: &ExcludeSet,
        session_id: &str,
    ) -> Result<Self, SandboxError> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("mutation-tester-{}-", session_id))
            .tempdir()
            .map_err(SandboxError::Create)?;

        copy_tree::copy_tree(project_root, dir.path(), excludes).map_err(|source| {
            SandboxError::Copy {
                dest: dir.path().to_path_buf(),
                source,
            }
        })?;

        Ok(Self { dir })
    }

    /// A copy with `mutant` written over its file.
    pub fn materialize(
        project_root: &Path,
        excludes: &ExcludeSet,
        mutant: &Mutant,
        session_id: &str,
    ) -> Result<Self, SandboxError> {
        let sandbox = Self::pristine(project_root, excludes, session_id)?;
        let target = sandbox.dir.path().join(mutant.site.file.as_std_path());
        if !target.is_file() {
            return Err(SandboxError::MissingTarget {
                path: mutant.site.file.clone(),
            });
        }
        std::fs::write(&target, &mutant.mutated_text)
            .map_err(|source| SandboxError::Write { path: target, source })?;
        Ok(sandbox)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the arena, surfacing removal failures. Dropping a sandbox
    /// without calling this still deletes it, silently.
    pub fn dispose(self) -> Result<(), SandboxError> {
        let path: PathBuf = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|source| SandboxError::Remove { path, source })
    }
}
