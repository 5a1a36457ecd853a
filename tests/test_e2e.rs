use std::path::Path;
use std::process::{Command, Output};

fn tester_bin() -> &'static str {
    env!("CARGO_BIN_EXE_mutation-tester")
}

fn create_python_project(dir: &Path) {
    std::fs::write(
        dir.join("app.py"),
        r#"
def add(a, b):
    return a + b

def scale(x):
    if x:
        return x * 3
    return 0
"#,
    )
    .unwrap();

    std::fs::write(
        dir.join("test_app.py"),
        r#"
from app import add, scale

def test_add():
    assert add(1, 2) == 3
"#,
    )
    .unwrap();

    // Catches the arithmetic mutants but not the negated condition.
    std::fs::write(
        dir.join("check.sh"),
        "grep -q 'a + b' app.py && grep -q 'x \\* 3' app.py\n",
    )
    .unwrap();
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(tester_bin())
        .arg(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mutation-tester")
}

fn json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON ({}): {}", e, stdout))
}

fn leftover_sandboxes(session: &str) -> usize {
    let prefix = format!("mutation-tester-{}-", session);
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .count()
}

#[test]
fn e2e_full_run_json_output() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    let output = run(
        dir.path(),
        &["--json", "--test-cmd", "sh check.sh", "--min-score", "60", "--session", "e2e-json"],
    );
    let report = json(&output);

    assert_eq!(output.status.code(), Some(0), "{:?}", output);
    assert_eq!(report["dry_run"], false);
    assert_eq!(report["pass"], true);
    assert_eq!(report["overall"]["total"], 3);
    assert_eq!(report["overall"]["killed"], 2);
    assert_eq!(report["overall"]["survived"], 1);
    assert_eq!(report["files"]["app.py"]["total"], 3);
    assert!(report["files"].get("test_app.py").is_none());

    let survivors = report["survived_mutants"].as_array().unwrap();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0]["operator"], "negate_if");
    assert_eq!(survivors[0]["mutant_id"], "app.py:6:8:negate_if");
    assert_eq!(survivors[0]["replacement"], "not (x)");
}

#[test]
fn e2e_below_threshold_exits_one() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    let output = run(
        dir.path(),
        &["--json", "--test-cmd", "sh check.sh", "--min-score", "80", "--session", "e2e-fail"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json(&output)["pass"], false);
}

#[test]
fn e2e_suite_that_never_fails_scores_zero() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());
    std::fs::write(dir.path().join("check.sh"), "exit 0\n").unwrap();

    let output = run(dir.path(), &["--json", "--test-cmd", "sh check.sh"]);
    let report = json(&output);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(report["overall"]["killed"], 0);
    assert_eq!(report["overall"]["score"], 0.0);
    assert_eq!(report["survived_mutants"].as_array().unwrap().len(), 3);
}

#[test]
fn e2e_dry_run_lists_mutants_without_testing() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    // A test command that would fail proves nothing ran.
    let output = run(
        dir.path(),
        &["--dry-run", "--json", "--test-cmd", "no-such-test-runner-4242", "--session", "e2e-dry"],
    );
    let report = json(&output);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["discovered"], 3);
    let ids: Vec<String> = report["mutants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| {
            format!(
                "{}:{}:{}:{}",
                m["file"].as_str().unwrap(),
                m["line"],
                m["column"],
                m["operator"].as_str().unwrap()
            )
        })
        .collect();
    assert_eq!(
        ids,
        vec!["app.py:3:14:add_to_sub", "app.py:6:8:negate_if", "app.py:7:18:mul_to_div"]
    );
    assert_eq!(leftover_sandboxes("e2e-dry"), 0);
}

#[test]
fn e2e_dry_run_table_output() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    let output = run(dir.path(), &["--dry-run"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("app.py"), "{}", stdout);
    assert!(stdout.contains("Found 3 mutants"), "{}", stdout);
}

#[test]
fn e2e_table_output() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    let output = run(dir.path(), &["--test-cmd", "sh check.sh", "--min-score", "50"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "{}", stdout);
    assert!(stdout.contains("OVERALL"));
    assert!(stdout.contains("66.7%"));
    assert!(stdout.contains("Surviving mutants:"));
    assert!(stdout.contains("PASS"));
}

#[test]
fn e2e_max_mutants_truncates_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    let output = run(
        dir.path(),
        &["--json", "--test-cmd", "sh check.sh", "--max-mutants", "1"],
    );
    let report = json(&output);
    assert_eq!(report["discovered"], 3);
    assert_eq!(report["overall"]["total"], 1);
    assert_eq!(report["overall"]["killed"], 1);
}

#[test]
fn e2e_project_is_never_modified() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());
    let before = std::fs::read(dir.path().join("app.py")).unwrap();

    let output = run(
        dir.path(),
        &["--test-cmd", "sh check.sh", "--jobs", "3", "--session", "e2e-clean"],
    );
    assert!(output.status.code().is_some());

    assert_eq!(std::fs::read(dir.path().join("app.py")).unwrap(), before);
    assert_eq!(leftover_sandboxes("e2e-clean"), 0);
}

#[test]
fn e2e_mutate_tests_includes_test_files() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    let output = run(dir.path(), &["--dry-run", "--json", "--mutate-tests"]);
    let report = json(&output);
    // test_app.py has no sites of its own but is now scanned.
    assert_eq!(report["files"], 2);
}

#[test]
fn e2e_no_mutants_is_a_usage_error() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("README.md"), "nothing to mutate\n").unwrap();

    let output = run(dir.path(), &["--test-cmd", "sh -c true"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no mutants found"), "{}", stderr);
}

#[test]
fn e2e_missing_test_command_exits_three() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());

    let output = run(dir.path(), &["--test-cmd", "no-such-test-runner-4242"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no-such-test-runner-4242"), "{}", stderr);
}

#[test]
fn e2e_failing_baseline_exits_three() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());
    std::fs::write(dir.path().join("check.sh"), "exit 1\n").unwrap();

    let output = run(dir.path(), &["--test-cmd", "sh check.sh", "--session", "e2e-base"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("tests fail before mutation"), "{}", stderr);
    assert_eq!(leftover_sandboxes("e2e-base"), 0);
}

#[test]
fn e2e_skip_baseline_runs_anyway() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());
    std::fs::write(dir.path().join("check.sh"), "exit 1\n").unwrap();

    let output = run(dir.path(), &["--json", "--test-cmd", "sh check.sh", "--skip-baseline"]);
    let report = json(&output);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(report["overall"]["killed"], 3);
}

#[test]
fn e2e_config_file_with_cli_override() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());
    let config = dir.path().join("mutation.yaml");
    std::fs::write(
        &config,
        "test_command: sh check.sh\nmin_score_pct: 90\noperators: [add_to_sub, mul_to_div]\n",
    )
    .unwrap();

    let output = run(dir.path(), &["--json", "--config", config.to_str().unwrap()]);
    let report = json(&output);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(report["overall"]["total"], 2);
    assert_eq!(report["min_score_pct"], 90.0);

    let output = run(
        dir.path(),
        &["--json", "--config", config.to_str().unwrap(), "--operator", "negate_if"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json(&output)["overall"]["total"], 1);
}

#[test]
fn e2e_invalid_config_exits_two() {
    let dir = tempfile::TempDir::new().unwrap();
    create_python_project(dir.path());
    let config = dir.path().join("mutation.yaml");
    std::fs::write(&config, "timeout: 5\n").unwrap();

    let output = run(dir.path(), &["--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn e2e_dry_run_without_mutants_exits_two() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("README.md"), "nothing to mutate\n").unwrap();

    let output = run(dir.path(), &["--dry-run"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no mutants found"), "{}", stderr);
}
