//! CLI for the retraining pipeline.
//!
//! This module contains the argument surface and all command handlers.

mod commands;
mod logging;

pub use commands::run_command;
pub use logging::LogLevel;

use crate::train::ModelVersion;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Renovar: continuous credit-risk model retraining
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "renovar")]
#[command(version)]
#[command(
    about = "Continuous-learning pipeline: ingest batches, retrain, validate, deploy, roll back"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// State root directory (overrides the config file)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the pipeline once: merge, train, validate, deploy or reject
    Run,

    /// Ingest a batch file into the pending area
    Ingest(IngestArgs),

    /// Run the pipeline on a recurring cadence until interrupted
    Schedule(ScheduleArgs),

    /// Show recent deployment history
    History(HistoryArgs),

    /// Roll back the active model to an earlier version
    Rollback(RollbackArgs),

    /// Show dataset-store statistics and the active model
    Status,

    /// Score a batch file with the active model
    Score(ScoreArgs),

    /// Create the state layout, optionally seeding the corpus
    Init(InitArgs),
}

/// Arguments for the ingest command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct IngestArgs {
    /// Batch file to ingest
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Stored-name stem for the batch (defaults to the file name)
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the schedule command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ScheduleArgs {
    /// Cadence: 'daily' or a weekday name
    #[arg(short, long, default_value = "daily")]
    pub every: String,

    /// Time of day to fire, HH:MM
    #[arg(short, long, default_value = "02:00")]
    pub at: String,
}

/// Arguments for the history command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct HistoryArgs {
    /// Number of entries to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,
}

/// Arguments for the rollback command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RollbackArgs {
    /// Version to return to, e.g. 1.2; defaults to the previously active one
    #[arg(value_name = "VERSION")]
    pub version: Option<ModelVersion>,
}

/// Arguments for the score command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ScoreArgs {
    /// Input file with customer rows
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Where to write the scored file
    #[arg(short, long, default_value = "scored.csv")]
    pub output: PathBuf,
}

/// Arguments for the init command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InitArgs {
    /// Seed the canonical corpus from this file
    #[arg(long)]
    pub corpus: Option<PathBuf>,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = parse_args(["renovar", "run"]).unwrap();
        assert_eq!(cli.command, Command::Run);
        assert!(!cli.verbose);
        assert!(cli.root.is_none());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = parse_args(["renovar", "run", "--root", "/state", "--verbose"]).unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/state")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_ingest() {
        let cli = parse_args(["renovar", "ingest", "batch.csv", "--name", "august"]).unwrap();
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.file, PathBuf::from("batch.csv"));
                assert_eq!(args.name.as_deref(), Some("august"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_schedule_defaults() {
        let cli = parse_args(["renovar", "schedule"]).unwrap();
        match cli.command {
            Command::Schedule(args) => {
                assert_eq!(args.every, "daily");
                assert_eq!(args.at, "02:00");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rollback_version() {
        let cli = parse_args(["renovar", "rollback", "1.2"]).unwrap();
        match cli.command {
            Command::Rollback(args) => {
                assert_eq!(args.version, Some(ModelVersion::new(1, 2)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rollback_implicit_previous() {
        let cli = parse_args(["renovar", "rollback"]).unwrap();
        assert_eq!(cli.command, Command::Rollback(RollbackArgs { version: None }));
    }

    #[test]
    fn test_parse_rejects_bad_version() {
        assert!(parse_args(["renovar", "rollback", "v1"]).is_err());
    }

    #[test]
    fn test_parse_score_with_output() {
        let cli = parse_args(["renovar", "score", "in.csv", "--output", "out.csv"]).unwrap();
        match cli.command {
            Command::Score(args) => {
                assert_eq!(args.input, PathBuf::from("in.csv"));
                assert_eq!(args.output, PathBuf::from("out.csv"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_history_limit() {
        let cli = parse_args(["renovar", "history", "--limit", "3"]).unwrap();
        assert_eq!(cli.command, Command::History(HistoryArgs { limit: 3 }));
    }

    #[test]
    fn test_parse_requires_subcommand() {
        assert!(parse_args(["renovar"]).is_err());
    }
}
