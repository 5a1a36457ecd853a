use mutation_tester::config::Config;
use mutation_tester::engine::{self, RunReport};
use mutation_tester::error::RunError;
use mutation_tester::operators::OperatorId;
use mutation_tester::output;
use mutation_tester::pool::{self, CancelToken};

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(
    name = "mutation-tester",
    version,
    about = "Rigorous mutation testing: perturb the code, rerun the suite, report what it missed"
)]
struct Cli {
    /// Project root directory
    target_dir: Option<PathBuf>,
    /// YAML config file (CLI flags take precedence)
    #[arg(short, long, env = "MUTATION_TESTER_CONFIG")]
    config: Option<PathBuf>,
    /// Glob pattern pruned from scanning and sandbox copies (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,
    /// Test command run inside each sandbox (default: "pytest -q --tb=no")
    #[arg(long)]
    test_cmd: Option<String>,
    /// Per-mutant timeout in seconds (default: 30)
    #[arg(long)]
    timeout: Option<u64>,
    /// Maximum number of mutants to test (default: 500)
    #[arg(long)]
    max_mutants: Option<usize>,
    /// Fail if the overall kill rate is below this percentage (default: 70)
    #[arg(long)]
    min_score: Option<f64>,
    /// Concurrent test processes (default: 2)
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Enable only these operators (repeatable), e.g. add_to_sub, negate_if
    #[arg(long = "operator", value_parser = parse_operator)]
    operators: Vec<OperatorId>,
    /// Languages to mutate (repeatable): python, rust
    #[arg(long = "language")]
    languages: Vec<String>,
    /// Enumerate mutants without running any tests
    #[arg(long)]
    dry_run: bool,
    /// Also mutate the project's own test files
    #[arg(long)]
    mutate_tests: bool,
    /// Do not check that the suite passes before mutating
    #[arg(long)]
    skip_baseline: bool,
    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,
    /// Session ID used to name sandbox directories (default: random)
    #[arg(long)]
    session: Option<String>,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_operator(name: &str) -> Result<OperatorId, String> {
    OperatorId::from_name(name).ok_or_else(|| {
        format!(
            "unknown operator '{}'; expected one of: {}",
            name,
            mutation_tester::operators::PRIORITY
                .iter()
                .map(|op| op.name())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

impl Cli {
    fn into_config(self) -> Result<Config, RunError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = self.target_dir {
            config.target_dir = dir;
        }
        if !self.exclude.is_empty() {
            config.exclude_patterns = self.exclude;
        }
        if let Some(cmd) = self.test_cmd {
            config.test_command = cmd;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(max) = self.max_mutants {
            config.max_mutants = max;
        }
        if let Some(min) = self.min_score {
            config.min_score_pct = min;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if !self.operators.is_empty() {
            config.operators = self.operators;
        }
        if !self.languages.is_empty() {
            config.languages = self.languages;
        }
        config.dry_run |= self.dry_run;
        config.mutate_tests |= self.mutate_tests;
        config.skip_baseline |= self.skip_baseline;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    process::exit(cmd_run(cli));
}

fn cmd_run(cli: Cli) -> i32 {
    let json_mode = cli.json;
    let verbose = cli.verbose > 0;
    let session_id = cli
        .session
        .clone()
        .unwrap_or_else(engine::generate_session_id);

    let config = match cli.into_config() {
        Ok(c) => c,
        Err(e) => {
            output::print_error(&e.to_string());
            return e.exit_code();
        }
    };

    let cancel = CancelToken::new();
    if let Err(e) = pool::install_interrupt_handler(&cancel) {
        // Runs still work; they just cannot be interrupted cleanly.
        tracing::warn!("{}", e);
    }

    let report = match engine::run(&config, &session_id, &cancel) {
        Ok(r) => r,
        Err(e) => {
            output::print_error(&e.to_string());
            return e.exit_code();
        }
    };

    match report {
        RunReport::DryRun(dry) => {
            if json_mode {
                println!("{}", output::dry_run_json(&dry));
            } else {
                output::print_dry_run(&dry, verbose);
            }
            0
        }
        RunReport::Tested(tested) => {
            if json_mode {
                println!("{}", output::tested_json(&tested));
            } else {
                output::print_tested(&tested);
            }
            if tested.stats.pass { 0 } else { 1 }
        }
    }
}
