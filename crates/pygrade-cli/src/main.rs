mod suite;

use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pygrade::{DEFAULT_MAX_RECURSION_DEPTH, Interpreter, ResourceLimits, TestSession, grade};

use crate::suite::Suite;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Grade a Python submission against a JSON test suite.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Python file to grade
    submission: PathBuf,
    /// JSON test suite
    suite: PathBuf,
    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// Maximum call depth of the submission before it gets a RecursionError
    #[arg(long, default_value_t = DEFAULT_MAX_RECURSION_DEPTH)]
    max_recursion_depth: usize,
    /// Log test and group lifecycle to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let code = fs::read_to_string(&cli.submission)
        .with_context(|| format!("failed to read submission {}", cli.submission.display()))?;
    let text = fs::read_to_string(&cli.suite).with_context(|| format!("failed to read suite {}", cli.suite.display()))?;
    let suite = Suite::from_json(&text).with_context(|| format!("failed to load suite {}", cli.suite.display()))?;
    let plan = suite.compile().context("invalid suite")?;

    let script_name = suite.script_name.clone().unwrap_or_else(|| {
        cli.submission
            .file_name()
            .map_or_else(|| "submission.py".to_owned(), |name| name.to_string_lossy().into_owned())
    });
    let limits = ResourceLimits::new().max_recursion_depth(cli.max_recursion_depth);
    let sandbox = Interpreter::new(code.clone()).with_limits(limits);
    let mut session = TestSession::with_sandbox(code, Box::new(sandbox))
        .params(suite.params)
        .script_name(script_name);

    let report = grade(&mut session, move |session| plan.replay(session)).context("grading script error")?;
    match cli.format {
        Format::Text => println!("{report}"),
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize report")?
        ),
    }
    Ok(())
}
