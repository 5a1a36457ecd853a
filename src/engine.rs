//! One complete invocation: scan, baseline, judge every mutant, aggregate.

use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::config::Config;
use crate::copy_tree::ExcludeSet;
use crate::error::RunError;
use crate::locator::{self, Scan, ScanOptions};
use crate::mutants::{MutantRecord, TestOutcome};
use crate::pool::{self, CancelToken};
use crate::runner::{self, Runner};
use crate::stats::{self, RunStats};

#[derive(Debug)]
pub enum RunReport {
    DryRun(DryRunReport),
    Tested(TestedReport),
}

#[derive(Debug)]
pub struct DryRunReport {
    /// Sites already truncated to `max_mutants`.
    pub scan: Scan,
    /// Sites found before truncation.
    pub discovered: usize,
}

#[derive(Debug)]
pub struct TestedReport {
    pub records: Vec<MutantRecord>,
    pub stats: RunStats,
    pub discovered: usize,
    pub skipped_files: Vec<Utf8PathBuf>,
    /// Set when an interrupt stopped the run early.
    pub cancelled: bool,
}

impl TestedReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &TestOutcome> {
        self.records.iter().filter_map(|r| match r {
            MutantRecord::Tested(o) => Some(o),
            _ => None,
        })
    }

    pub fn infrastructure_failures(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, MutantRecord::Infrastructure { .. }))
            .count()
    }

    pub fn skipped_mutants(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r, MutantRecord::Skipped { .. }))
            .count()
    }
}

pub fn generate_session_id() -> String {
    format!("{:08x}", fastrand::u32(..))
}

pub fn run(
    config: &Config,
    session_id: &str,
    cancel: &CancelToken,
) -> Result<RunReport, RunError> {
    config.validate()?;
    let excludes = ExcludeSet::new(config.exclude_patterns.as_slice())?;
    let passes = config.passes()?;

    let mut scan = locator::scan_project(
        &config.target_dir,
        &ScanOptions {
            excludes: &excludes,
            passes: &passes,
            operators: &config.operators,
            mutate_tests: config.mutate_tests,
        },
    )?;
    let discovered = scan.sites.len();
    tracing::info!(
        "found {} mutants across {} files",
        discovered,
        scan.files.len()
    );
    if discovered > config.max_mutants {
        tracing::info!("keeping the first {} mutants", config.max_mutants);
        scan.sites.truncate(config.max_mutants);
    }

    if scan.sites.is_empty() {
        return Err(RunError::NoMutants {
            target: config.target_dir.clone(),
        });
    }
    if config.dry_run {
        return Ok(RunReport::DryRun(DryRunReport { scan, discovered }));
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let command = runner::parse_test_cmd(&config.test_command)?.resolve(&cwd, &config.target_dir);
    command.ensure_available()?;

    let runner = Runner {
        command,
        project_root: config.target_dir.clone(),
        excludes,
        timeout: Duration::from_secs(config.timeout_seconds),
        session_id: session_id.to_string(),
        cancel: cancel.clone(),
    };

    if config.skip_baseline {
        tracing::info!("skipping baseline test run");
    } else {
        let elapsed = runner.run_baseline()?;
        tracing::info!("baseline passed in {:.1}s", elapsed.as_secs_f64());
    }

    tracing::info!("testing {} mutants with {} workers", scan.sites.len(), config.jobs);
    let records = pool::run_pool(&scan.sites, &scan.files, &runner, config.jobs)?;
    let cancelled = cancel.is_cancelled();
    if cancelled {
        tracing::warn!(
            "interrupted; reporting {} of {} mutants",
            records.len(),
            scan.sites.len()
        );
    }

    let outcomes: Vec<TestOutcome> = records
        .iter()
        .filter_map(|r| match r {
            MutantRecord::Tested(o) => Some(o.clone()),
            _ => None,
        })
        .collect();
    let stats = stats::aggregate(&outcomes, config.min_score_pct);

    Ok(RunReport::Tested(TestedReport {
        records,
        stats,
        discovered,
        skipped_files: scan.skipped,
        cancelled,
    }))
}
