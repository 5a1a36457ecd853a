use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::copy_tree::ExcludeSet;
use crate::error::{RunError, SandboxError};
use crate::mutants::{Mutant, TestOutcome};
use crate::pool::CancelToken;
use crate::sandbox::Sandbox;
use crate::syntax::SyntaxPass;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The configured test command as an argv.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub program: String,
    pub args: Vec<String>,
}

pub fn parse_test_cmd(cmd: &str) -> Result<TestCommand, RunError> {
    let mut parts = cmd.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| RunError::InvalidCommand("test command is empty".into()))?;
    Ok(TestCommand {
        program,
        args: parts.collect(),
    })
}

impl TestCommand {
    /// Make a relative program path absolute, since the command runs from
    /// inside a sandbox that may not contain it (virtualenvs are never copied).
    pub fn resolve(mut self, cwd: &Path, project_root: &Path) -> Self {
        let p = Path::new(&self.program);
        if p.is_absolute() || !self.program.contains('/') {
            // Bare command (e.g. "pytest"): let PATH resolve it
            return self;
        }
        for base in [cwd, project_root] {
            let candidate = base.join(p);
            if candidate.exists() {
                self.program = candidate.to_string_lossy().to_string();
                break;
            }
        }
        self
    }

    /// Fail fast when the program cannot be executed at all.
    pub fn ensure_available(&self) -> Result<(), RunError> {
        let missing = |reason: &str| RunError::RunnerMissing {
            program: self.program.clone(),
            reason: reason.to_string(),
        };
        if self.program.contains('/') {
            let path = Path::new(&self.program);
            if !path.is_file() {
                return Err(missing("no such file"));
            }
            if !is_executable(path) {
                return Err(missing("file is not executable"));
            }
            return Ok(());
        }
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        let found = std::env::split_paths(&path_var)
            .map(|dir| dir.join(&self.program))
            .any(|candidate| candidate.is_file() && is_executable(&candidate));
        if found { Ok(()) } else { Err(missing("not found on PATH")) }
    }

    fn command(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(dir)
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .env("OBJC_DISABLE_INITIALIZE_FORK_SAFETY", "YES")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // Own process group, so a timeout can take down everything the
        // command started (pytest workers, make recipes, nested shells).
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Passed,
    Failed(ExitStatus),
    TimedOut,
    /// The run was cancelled while the command was still going.
    Interrupted,
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("test command '{program}' could not be started: {source}")]
    Missing {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("test process error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run `cmd` in `dir`, killing it once `timeout` elapses or `cancel` fires.
pub fn execute(
    cmd: &TestCommand,
    dir: &Path,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<(ExecStatus, Duration), ExecError> {
    let start = Instant::now();
    let mut child = cmd.command(dir).spawn().map_err(|source| match source.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => ExecError::Missing {
            program: cmd.program.clone(),
            source,
        },
        _ => ExecError::Io(source),
    })?;

    loop {
        if let Some(exit_status) = child.try_wait()? {
            let status = if exit_status.success() {
                ExecStatus::Passed
            } else {
                ExecStatus::Failed(exit_status)
            };
            return Ok((status, start.elapsed()));
        }
        if cancel.is_cancelled() {
            kill_group(&mut child);
            return Ok((ExecStatus::Interrupted, start.elapsed()));
        }
        if start.elapsed() > timeout {
            kill_group(&mut child);
            return Ok((ExecStatus::TimedOut, start.elapsed()));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// SIGKILL the child's whole process group, then reap the child.
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        let pgid = Pid::from_raw(child.id() as i32);
        if let Err(errno) = killpg(pgid, Signal::SIGKILL) {
            tracing::debug!(pgid = child.id(), "killpg failed ({}); killing child only", errno);
            let _ = child.kill();
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Per-mutant failures that do not produce a [`TestOutcome`].
#[derive(Debug, Error)]
pub enum MutantError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    /// The command vanished mid-run; fatal for the whole run.
    #[error("{0}")]
    RunnerMissing(String),
    #[error("interrupted")]
    Interrupted,
    #[error("{0}")]
    Process(String),
}

/// Everything needed to judge one mutant. Holds no per-mutant state.
pub struct Runner {
    pub command: TestCommand,
    pub project_root: PathBuf,
    pub excludes: ExcludeSet,
    pub timeout: Duration,
    pub session_id: String,
    /// Stops in-flight test processes when fired.
    pub cancel: CancelToken,
}

impl Runner {
    /// Run the suite against an unmutated copy.
    pub fn run_baseline(&self) -> Result<Duration, RunError> {
        let sandbox = Sandbox::pristine(&self.project_root, &self.excludes, &self.session_id)?;
        let result = execute(&self.command, sandbox.root(), self.timeout, &self.cancel);
        if let Err(e) = sandbox.dispose() {
            tracing::warn!("{}", e);
        }
        // A failure seen after an interrupt says nothing about the suite.
        if self.cancel.is_cancelled() {
            return Err(RunError::Interrupted);
        }
        match result {
            Ok((ExecStatus::Passed, elapsed)) => Ok(elapsed),
            Ok((ExecStatus::Interrupted, _)) => Err(RunError::Interrupted),
            Ok((ExecStatus::Failed(status), _)) => Err(RunError::BaselineFailed {
                status: status.to_string(),
            }),
            Ok((ExecStatus::TimedOut, _)) => Err(RunError::BaselineTimedOut {
                seconds: self.timeout.as_secs(),
            }),
            Err(ExecError::Missing { program, source }) => Err(RunError::RunnerMissing {
                program,
                reason: source.to_string(),
            }),
            Err(ExecError::Io(source)) => Err(RunError::RunnerMissing {
                program: self.command.program.clone(),
                reason: source.to_string(),
            }),
        }
    }

    /// Judge one mutant. A mutant that does not parse is killed without
    /// creating a sandbox or spawning anything.
    pub fn run_mutant(
        &self,
        mutant: &Mutant,
        pass: &dyn SyntaxPass,
    ) -> Result<TestOutcome, MutantError> {
        if !pass.is_well_formed(&mutant.mutated_text) {
            tracing::debug!(mutant = %mutant.site, "mutant does not parse; killed");
            return Ok(outcome(mutant, true, false, Duration::ZERO));
        }

        let sandbox = Sandbox::materialize(
            &self.project_root,
            &self.excludes,
            mutant,
            &self.session_id,
        )?;
        let result = execute(&self.command, sandbox.root(), self.timeout, &self.cancel);
        sandbox.dispose()?;

        match result {
            Ok((status, elapsed)) => {
                let (killed, timed_out) = match status {
                    ExecStatus::Passed => (false, false),
                    ExecStatus::Failed(_) => (true, false),
                    ExecStatus::TimedOut => (false, true),
                    ExecStatus::Interrupted => return Err(MutantError::Interrupted),
                };
                Ok(outcome(mutant, killed, timed_out, elapsed))
            }
            Err(e @ ExecError::Missing { .. }) => Err(MutantError::RunnerMissing(e.to_string())),
            Err(e) => Err(MutantError::Process(e.to_string())),
        }
    }
}

fn outcome(mutant: &Mutant, killed: bool, timed_out: bool, elapsed: Duration) -> TestOutcome {
    TestOutcome {
        mutant_id: mutant.site.id(),
        file: mutant.site.file.clone(),
        line: mutant.site.line,
        column: mutant.site.column,
        operator: mutant.site.operator,
        original: mutant.original.clone(),
        replacement: mutant.replacement.clone(),
        killed,
        timed_out,
        duration_ms: elapsed.as_millis() as u64,
    }
}

/// Line diff between the original file and a mutant, for listings.
pub fn generate_diff(original: &str, mutated: &str) -> String {
    use similar::TextDiff;
    let diff = TextDiff::from_lines(original, mutated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                output.push_str(&format!("- {}", change));
            }
            similar::ChangeTag::Insert => {
                output.push_str(&format!("+ {}", change));
            }
            _ => {}
        }
    }
    output
}
