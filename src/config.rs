//! Run configuration: defaults, an optional YAML file, then CLI overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::operators::{OperatorId, PRIORITY};
use crate::syntax::SyntaxPass;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Project root to scan.
    pub target_dir: PathBuf,
    /// Globs pruned from scanning and from sandbox copies.
    pub exclude_patterns: Vec<String>,
    /// Whitespace-separated argv run inside each sandbox.
    pub test_command: String,
    pub timeout_seconds: u64,
    pub max_mutants: usize,
    pub min_score_pct: f64,
    pub dry_run: bool,
    /// Concurrent test processes.
    pub jobs: usize,
    pub operators: Vec<OperatorId>,
    pub languages: Vec<String>,
    /// Also mutate the project's own test files.
    pub mutate_tests: bool,
    pub skip_baseline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::from("."),
            exclude_patterns: Vec::new(),
            test_command: "pytest -q --tb=no".to_string(),
            timeout_seconds: 30,
            max_mutants: 500,
            min_score_pct: 70.0,
            dry_run: false,
            jobs: 2,
            operators: PRIORITY.to_vec(),
            languages: vec!["python".to_string()],
            mutate_tests: false,
            skip_baseline: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_target_dir(mut self, target_dir: impl Into<PathBuf>) -> Self {
        self.target_dir = target_dir.into();
        self
    }

    pub fn with_test_command(mut self, test_command: impl Into<String>) -> Self {
        self.test_command = test_command.into();
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_min_score_pct(mut self, min_score_pct: f64) -> Self {
        self.min_score_pct = min_score_pct;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        if !self.target_dir.is_dir() {
            return invalid(format!(
                "target directory '{}' does not exist or is not a directory",
                self.target_dir.display()
            ));
        }
        if self.test_command.trim().is_empty() {
            return invalid("test command is empty".into());
        }
        if self.timeout_seconds == 0 {
            return invalid("timeout must be at least 1 second".into());
        }
        if self.max_mutants == 0 {
            return invalid("max mutants must be at least 1".into());
        }
        if self.jobs == 0 {
            return invalid("jobs must be at least 1".into());
        }
        if !(0.0..=100.0).contains(&self.min_score_pct) {
            return invalid(format!(
                "minimum score {} is outside 0..=100",
                self.min_score_pct
            ));
        }
        if self.operators.is_empty() {
            return invalid("at least one operator must be enabled".into());
        }
        if self.languages.is_empty() {
            return invalid("at least one language must be enabled".into());
        }
        self.passes().map(|_| ())
    }

    /// The syntax passes named by `languages`.
    pub fn passes(&self) -> Result<Vec<&'static dyn SyntaxPass>, ConfigError> {
        self.languages
            .iter()
            .map(|name| {
                crate::pass_by_name(name).ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "unknown language '{}'; supported: {}",
                        name,
                        crate::PASSES
                            .iter()
                            .map(|p| p.name())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })
            })
            .collect()
    }
}
