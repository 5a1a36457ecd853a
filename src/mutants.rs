use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::operators::OperatorId;

/// One operator applied to one node. Field order gives the canonical
/// `(file, line, column)` ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MutationSite {
    pub file: Utf8PathBuf,
    pub line: usize,
    pub column: usize,
    pub operator: OperatorId,
}

impl MutationSite {
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MutationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.file, self.line, self.column, self.operator)
    }
}

#[derive(Debug, Clone)]
pub struct Mutant {
    pub site: MutationSite,
    pub original: String,
    pub replacement: String,
    /// Full content of `site.file` with the single edit applied.
    pub mutated_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub mutant_id: String,
    pub file: Utf8PathBuf,
    pub line: usize,
    pub column: usize,
    pub operator: OperatorId,
    pub original: String,
    pub replacement: String,
    pub killed: bool,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl TestOutcome {
    pub fn survived(&self) -> bool {
        !self.killed && !self.timed_out
    }

    pub fn site(&self) -> MutationSite {
        MutationSite {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
            operator: self.operator,
        }
    }
}

/// What happened to one site during a run.
#[derive(Debug, Clone)]
pub enum MutantRecord {
    Tested(TestOutcome),
    /// The sandbox failed; excluded from the score.
    Infrastructure { site: MutationSite, reason: String },
    /// The operator could not be applied; the mutant never existed.
    Skipped { site: MutationSite, reason: String },
}

impl MutantRecord {
    pub fn site(&self) -> MutationSite {
        match self {
            MutantRecord::Tested(outcome) => outcome.site(),
            MutantRecord::Infrastructure { site, .. } | MutantRecord::Skipped { site, .. } => {
                site.clone()
            }
        }
    }
}
