//! fugue-conformance binary
//!
//! Runs scenario fixtures and exits non-zero when any of them fails.

mod cli;

use anyhow::{bail, Context, Result};
use cli::{Cli, Command};
use fugue_conformance::{collect_fixtures, RunnerConfig, Scenario, ScenarioRunner, SuiteRunner};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(&cli.log_level, cli.json_logs);

    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)
            .with_context(|| format!("failed to load runner config {}", path.display()))?,
        None => RunnerConfig::default(),
    };

    match cli.command {
        Command::Run { paths } => run(config, &paths),
        Command::Check { paths } => check(&paths),
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn run(config: RunnerConfig, paths: &[PathBuf]) -> Result<()> {
    let suite = SuiteRunner::new(ScenarioRunner::new(config));
    let stats = suite.run_paths(paths)?;

    println!(
        "{} scenarios: {} passed, {} failed ({:.2?})",
        stats.total, stats.passed, stats.failed, stats.duration
    );
    for failure in &stats.failures {
        println!("  FAIL {}: {}", failure.path.display(), failure.error);
    }

    if !stats.is_success() {
        bail!("{} of {} scenarios failed", stats.failed, stats.total);
    }
    Ok(())
}

fn check(paths: &[PathBuf]) -> Result<()> {
    let mut invalid = 0usize;
    let mut total = 0usize;
    for path in paths {
        for fixture in collect_fixtures(path)? {
            total += 1;
            if let Err(err) = Scenario::from_path(&fixture) {
                invalid += 1;
                println!("  INVALID {}: {err}", fixture.display());
            }
        }
    }
    println!("{total} fixtures checked, {invalid} invalid");

    if invalid > 0 {
        bail!("{invalid} of {total} fixtures are invalid");
    }
    Ok(())
}
