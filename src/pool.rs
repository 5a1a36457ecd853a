//! Bounded worker pool that judges mutants concurrently.
//!
//! Workers pull site indices from a shared cursor and send one [`MutantRecord`]
//! each over a channel; that channel is the only place their results meet.
//! Records are re-sorted by site once every worker has stopped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, OnceLock};

use camino::Utf8PathBuf;

use crate::error::{MutationApplyError, RunError};
use crate::locator::{self, SourceFile};
use crate::mutants::{MutantRecord, MutationSite};
use crate::runner::{MutantError, Runner};

/// Shared stop flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Route Ctrl-C to `token`. Only the first call installs a handler.
pub fn install_interrupt_handler(token: &CancelToken) -> Result<(), RunError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let token = token.clone();
    let result = INIT.get_or_init(move || {
        ctrlc::set_handler(move || {
            token.cancel();
        })
        .map_err(|e| e.to_string())
    });

    match result {
        Ok(()) => Ok(()),
        Err(msg) => Err(RunError::Signal(msg.clone())),
    }
}

enum Message {
    Record(MutantRecord),
    Fatal(RunError),
}

/// Judge every site with at most `workers` concurrent test processes.
///
/// Cancellation goes through `runner.cancel`: sites not started produce no
/// record, and tests still running are killed and discarded. A test command
/// that disappears mid-run cancels the pool and is returned as the error.
pub fn run_pool(
    sites: &[MutationSite],
    files: &BTreeMap<Utf8PathBuf, SourceFile>,
    runner: &Runner,
    workers: usize,
) -> Result<Vec<MutantRecord>, RunError> {
    let cancel = &runner.cancel;
    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<Message>();
    let mut records = Vec::with_capacity(sites.len());
    let mut fatal = None;

    std::thread::scope(|scope| {
        for worker in 0..workers.max(1) {
            let tx = tx.clone();
            let cursor = &cursor;
            scope.spawn(move || {
                while !cancel.is_cancelled() {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(site) = sites.get(index) else {
                        break;
                    };
                    tracing::debug!(worker, mutant = %site, "testing");
                    let message = judge(site, files, runner);
                    let Some(message) = message else {
                        break;
                    };
                    if tx.send(message).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        for message in rx {
            match message {
                Message::Record(record) => {
                    log_record(&record, records.len() + 1, sites.len());
                    records.push(record);
                }
                Message::Fatal(e) => {
                    cancel.cancel();
                    fatal.get_or_insert(e);
                }
            }
        }
    });

    if let Some(e) = fatal {
        return Err(e);
    }
    records.sort_by_key(MutantRecord::site);
    Ok(records)
}

fn judge(
    site: &MutationSite,
    files: &BTreeMap<Utf8PathBuf, SourceFile>,
    runner: &Runner,
) -> Option<Message> {
    let prepared = files
        .get(&site.file)
        .ok_or_else(|| MutationApplyError::UnknownFile {
            file: site.file.clone(),
        })
        .and_then(|file| Ok((file, locator::mutate(file, site)?)));
    let (file, mutant) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::warn!("skipping mutant: {}", e);
            return Some(Message::Record(MutantRecord::Skipped {
                site: site.clone(),
                reason: e.to_string(),
            }));
        }
    };

    let result = runner.run_mutant(&mutant, file.pass);
    if runner.cancel.is_cancelled() {
        // Killed or racing the interrupt; the status proves nothing.
        return None;
    }
    match result {
        Ok(outcome) => Some(Message::Record(MutantRecord::Tested(outcome))),
        Err(MutantError::RunnerMissing(reason)) => Some(Message::Fatal(RunError::RunnerMissing {
            program: runner.command.program.clone(),
            reason,
        })),
        Err(e) => {
            tracing::warn!(mutant = %site, "infrastructure failure: {}", e);
            Some(Message::Record(MutantRecord::Infrastructure {
                site: site.clone(),
                reason: e.to_string(),
            }))
        }
    }
}

fn log_record(record: &MutantRecord, done: usize, total: usize) {
    match record {
        MutantRecord::Tested(o) => {
            let verdict = if o.killed {
                "killed"
            } else if o.timed_out {
                "timed out"
            } else {
                "survived"
            };
            tracing::info!("[{}/{}] {} {}", done, total, o.mutant_id, verdict);
        }
        MutantRecord::Infrastructure { site, .. } => {
            tracing::info!("[{}/{}] {} infrastructure failure", done, total, site);
        }
        MutantRecord::Skipped { site, .. } => {
            tracing::info!("[{}/{}] {} skipped", done, total, site);
        }
    }
}
