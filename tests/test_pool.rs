use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use mutation_tester::copy_tree::ExcludeSet;
use mutation_tester::error::RunError;
use mutation_tester::locator::{self, Scan, ScanOptions};
use mutation_tester::mutants::{MutantRecord, MutationSite};
use mutation_tester::operators::{OperatorId, PRIORITY};
use mutation_tester::parser::PYTHON;
use mutation_tester::pool::{self, CancelToken};
use mutation_tester::runner::{self, Runner, TestCommand};
use mutation_tester::syntax::SyntaxPass;
use pretty_assertions::assert_eq;

fn project(dir: &Path) {
    fs::write(
        dir.join("calc.py"),
        "def area(w, h):\n    return w * h\n\ndef grow(x):\n    return x + 1\n",
    )
    .unwrap();
    fs::write(
        dir.join("loop.py"),
        "def drain(n):\n    while n:\n        n = n - 1\n    if n:\n        return n / 2\n    return n\n",
    )
    .unwrap();
    // Detects changes to calc.py only.
    fs::write(
        dir.join("check.sh"),
        "grep -q 'w \\* h' calc.py && grep -q 'x + 1' calc.py\n",
    )
    .unwrap();
}

fn scan(dir: &Path) -> Scan {
    let passes: Vec<&'static dyn SyntaxPass> = vec![&PYTHON];
    locator::scan_project(
        dir,
        &ScanOptions {
            excludes: &ExcludeSet::default(),
            passes: &passes,
            operators: &PRIORITY,
            mutate_tests: false,
        },
    )
    .unwrap()
}

fn runner(dir: &Path, command: TestCommand, session: &str) -> Runner {
    Runner {
        command,
        project_root: dir.to_path_buf(),
        excludes: ExcludeSet::default(),
        timeout: Duration::from_secs(10),
        session_id: session.to_string(),
        cancel: CancelToken::new(),
    }
}

fn leftover_sandboxes(session: &str) -> usize {
    let prefix = format!("mutation-tester-{}-", session);
    fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .count()
}

fn tested(records: &[MutantRecord]) -> Vec<(String, bool)> {
    records
        .iter()
        .map(|r| match r {
            MutantRecord::Tested(o) => (o.mutant_id.clone(), o.killed),
            other => panic!("unexpected record {:?}", other),
        })
        .collect()
}

#[test]
fn pool_judges_every_site_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    project(dir.path());
    let scan = scan(dir.path());
    let runner = runner(dir.path(), runner::parse_test_cmd("sh check.sh").unwrap(), "pool-order");

    let records = pool::run_pool(&scan.sites, &scan.files, &runner, 4).unwrap();
    assert_eq!(
        tested(&records),
        vec![
            ("calc.py:2:14:mul_to_div".to_string(), true),
            ("calc.py:5:14:add_to_sub".to_string(), true),
            ("loop.py:2:11:negate_while".to_string(), false),
            ("loop.py:3:15:sub_to_add".to_string(), false),
            ("loop.py:4:8:negate_if".to_string(), false),
            ("loop.py:5:18:div_to_mul".to_string(), false),
        ]
    );
}

#[test]
fn worker_count_does_not_change_results() {
    let dir = tempfile::TempDir::new().unwrap();
    project(dir.path());
    let scan = scan(dir.path());
    let runner = runner(dir.path(), runner::parse_test_cmd("sh check.sh").unwrap(), "pool-jobs");

    let serial = pool::run_pool(&scan.sites, &scan.files, &runner, 1).unwrap();
    let parallel = pool::run_pool(&scan.sites, &scan.files, &runner, 8).unwrap();
    assert_eq!(tested(&serial), tested(&parallel));
}

#[test]
fn cancelled_pool_starts_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    project(dir.path());
    let scan = scan(dir.path());
    let runner = runner(dir.path(), runner::parse_test_cmd("sh check.sh").unwrap(), "pool-cancel");

    runner.cancel.cancel();
    let records = pool::run_pool(&scan.sites, &scan.files, &runner, 2).unwrap();
    assert!(records.is_empty());
}

#[test]
fn cancel_mid_run_discards_the_running_mutant() {
    let dir = tempfile::TempDir::new().unwrap();
    project(dir.path());
    let scan = scan(dir.path());
    let command = TestCommand {
        program: "sh".into(),
        args: vec!["-c".into(), "sleep 2".into()],
    };
    let runner = runner(dir.path(), command, "pool-midcancel");
    let trigger = runner.cancel.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        trigger.cancel();
    });

    let started = Instant::now();
    let records = pool::run_pool(&scan.sites, &scan.files, &runner, 1).unwrap();
    handle.join().unwrap();

    assert!(
        !records.iter().any(|r| matches!(r, MutantRecord::Tested(_))),
        "{:?}",
        records
    );
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert_eq!(leftover_sandboxes("pool-midcancel"), 0);
}

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn missing_runner_aborts_the_run() {
    let dir = tempfile::TempDir::new().unwrap();
    project(dir.path());
    let scan = scan(dir.path());
    let command = TestCommand {
        program: "no-such-test-runner-4242".into(),
        args: vec![],
    };
    let runner = runner(dir.path(), command, "pool-missing");

    let err = pool::run_pool(&scan.sites, &scan.files, &runner, 2).unwrap_err();
    assert!(matches!(err, RunError::RunnerMissing { .. }));
    assert!(runner.cancel.is_cancelled());
}

#[test]
fn unknown_file_is_skipped_not_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    project(dir.path());
    let scan = scan(dir.path());
    let runner = runner(dir.path(), runner::parse_test_cmd("sh check.sh").unwrap(), "pool-skip");

    let ghost = MutationSite {
        file: "ghost.py".into(),
        line: 1,
        column: 1,
        operator: OperatorId::AddToSub,
    };
    let records = pool::run_pool(&[ghost], &scan.files, &runner, 1).unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], MutantRecord::Skipped { .. }));
}
