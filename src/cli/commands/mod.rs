//! CLI command implementations

mod history;
mod ingest;
mod init;
mod pipeline;
mod rollback;
mod schedule;
mod score;
mod status;

#[cfg(test)]
mod tests;

use crate::cli::{Cli, Command, LogLevel};
use crate::config::PipelineConfig;

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Run => pipeline::run_pipeline(config, log_level),
        Command::Ingest(args) => ingest::run_ingest(args, config, log_level),
        Command::Schedule(args) => schedule::run_schedule(args, config, log_level),
        Command::History(args) => history::run_history(args, config, log_level),
        Command::Rollback(args) => rollback::run_rollback(args, config, log_level),
        Command::Status => status::run_status(config, log_level),
        Command::Score(args) => score::run_score(args, config, log_level),
        Command::Init(args) => init::run_init(args, config, log_level),
    }
}

/// Load the pipeline configuration, applying global CLI overrides.
fn resolve_config(cli: &Cli) -> Result<PipelineConfig, String> {
    let mut config = match &cli.config {
        Some(path) => {
            PipelineConfig::from_file(path).map_err(|e| format!("Config error: {e}"))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(root) = &cli.root {
        config = config.with_root(root);
    }
    config
        .validate()
        .map_err(|e| format!("Config error: {e}"))?;
    Ok(config)
}
