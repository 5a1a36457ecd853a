//! Error types for a mutation run.
//!
//! Per-file and per-mutant failures ([`ParseError`], [`MutationApplyError`],
//! [`SandboxError`]) are isolated by the caller and never abort the batch.
//! [`RunError`] covers the whole-run preconditions that do.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use thiserror::Error;

/// A source file that could not be read or parsed. The file is skipped.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid {language}: {detail}")]
    Syntax {
        path: Utf8PathBuf,
        language: &'static str,
        detail: String,
    },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: Utf8PathBuf },
}

/// An operator could not find its target node. That one mutant is skipped.
#[derive(Debug, Error)]
pub enum MutationApplyError {
    #[error("no mutable node at {site}")]
    NodeNotFound { site: String },

    #[error("node at {site} does not accept operator {operator}")]
    OperatorMismatch { site: String, operator: String },

    #[error("source file {file} was not scanned")]
    UnknownFile { file: Utf8PathBuf },
}

/// The sandbox arena could not be created, populated, or removed. The mutant is
/// counted as an infrastructure failure and kept out of the score.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create sandbox directory: {0}")]
    Create(#[source] std::io::Error),

    #[error("failed to copy project into {}: {source}", dest.display())]
    Copy {
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mutated file {path} is missing from the sandbox copy")]
    MissingTarget { path: Utf8PathBuf },

    #[error("failed to write mutant into {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove sandbox {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fatal errors: the run cannot judge any mutant.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("test command '{program}' is not usable: {reason}")]
    RunnerMissing { program: String, reason: String },

    #[error("invalid test command: {0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to scan {}: {source}", root.display())]
    Scan {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no mutants found under {}", target.display())]
    NoMutants { target: PathBuf },

    #[error("tests fail before mutation (exit status {status}); fix failing tests first")]
    BaselineFailed { status: String },

    #[error("baseline test run exceeded the {seconds}s timeout")]
    BaselineTimedOut { seconds: u64 },

    #[error("failed to prepare baseline sandbox: {0}")]
    Baseline(#[from] SandboxError),

    #[error("signal handler installation failed: {0}")]
    Signal(String),

    #[error("interrupted before any mutant was tested")]
    Interrupted,
}

impl RunError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(_) | RunError::InvalidCommand(_) | RunError::NoMutants { .. } => 2,
            RunError::Interrupted => 130,
            _ => 3,
        }
    }
}
