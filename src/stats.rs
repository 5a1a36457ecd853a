//! Kill-rate statistics, always recomputed from the complete outcome list.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::mutants::TestOutcome;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    pub total: usize,
    pub killed: usize,
    /// Test command exited zero.
    pub survived: usize,
    /// Neither killed nor survived: no proof either way.
    pub timed_out: usize,
    /// `killed / total`, 0 when there are no mutants.
    pub score: f64,
}

impl FileStats {
    fn add(&mut self, outcome: &TestOutcome) {
        self.total += 1;
        if outcome.killed {
            self.killed += 1;
        } else if outcome.timed_out {
            self.timed_out += 1;
        } else {
            self.survived += 1;
        }
    }

    fn finish(mut self) -> Self {
        self.score = if self.total == 0 {
            0.0
        } else {
            self.killed as f64 / self.total as f64
        };
        self
    }

    pub fn score_pct(&self) -> f64 {
        self.score * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub files: BTreeMap<Utf8PathBuf, FileStats>,
    pub overall: FileStats,
    pub min_score_pct: f64,
    pub pass: bool,
}

pub fn aggregate(outcomes: &[TestOutcome], min_score_pct: f64) -> RunStats {
    let mut files: BTreeMap<Utf8PathBuf, FileStats> = BTreeMap::new();
    let mut overall = FileStats::default();
    for outcome in outcomes {
        files.entry(outcome.file.clone()).or_default().add(outcome);
        overall.add(outcome);
    }
    let files = files
        .into_iter()
        .map(|(path, stats)| (path, stats.finish()))
        .collect();
    let overall = overall.finish();
    // Scaled comparison so that 4/5 against 80% is exact.
    let pass = if overall.total == 0 {
        min_score_pct <= 0.0
    } else {
        overall.killed as f64 * 100.0 >= min_score_pct * overall.total as f64
    };

    RunStats {
        files,
        overall,
        min_score_pct,
        pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorId;

    fn outcome(file: &str, line: usize, killed: bool, timed_out: bool) -> TestOutcome {
        TestOutcome {
            mutant_id: format!("{}:{}:1:add_to_sub", file, line),
            file: file.into(),
            line,
            column: 1,
            operator: OperatorId::AddToSub,
            original: "+".into(),
            replacement: "-".into(),
            killed,
            timed_out,
            duration_ms: 5,
        }
    }

    #[test]
    fn empty_outcomes_score_zero() {
        let stats = aggregate(&[], 0.0);
        assert_eq!(stats.overall.total, 0);
        assert_eq!(stats.overall.score, 0.0);
        assert!(stats.pass);

        let stats = aggregate(&[], 50.0);
        assert!(!stats.pass);
    }

    #[test]
    fn exact_threshold_passes() {
        let outcomes = vec![
            outcome("a.py", 1, true, false),
            outcome("a.py", 2, true, false),
            outcome("a.py", 3, true, false),
            outcome("a.py", 4, true, false),
            outcome("a.py", 5, false, false),
        ];
        assert!(aggregate(&outcomes, 80.0).pass);
        assert!(!aggregate(&outcomes, 80.1).pass);
    }
}
