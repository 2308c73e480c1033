//! CLI argument parsing for fugue-conformance

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Contract execution conformance harness
#[derive(Parser, Debug, Clone)]
#[command(name = "fugue-conformance")]
#[command(about = "Run contract execution scenarios against an in-memory Fugue ledger")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Runner configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run scenario files, or every *.json file under directories
    Run {
        /// Fixture files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Parse and validate fixtures without running them
    Check {
        /// Fixture files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["fugue-conformance", "run", "testdata"]);
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
        assert!(cli.config.is_none());
        match cli.command {
            Command::Run { paths } => assert_eq!(paths, vec![PathBuf::from("testdata")]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_custom_values() {
        let cli = Cli::parse_from([
            "fugue-conformance",
            "--log-level", "debug",
            "--json-logs",
            "--config", "/etc/fugue/runner.json",
            "check",
            "a.json",
            "suite/",
        ]);
        assert_eq!(cli.log_level, "debug");
        assert!(cli.json_logs);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/fugue/runner.json")));
        match cli.command {
            Command::Check { paths } => assert_eq!(paths.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_requires_paths() {
        assert!(Cli::try_parse_from(["fugue-conformance", "run"]).is_err());
    }
}
