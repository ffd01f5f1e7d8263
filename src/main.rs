//! Renovar CLI
//!
//! Command-line entry point for the retraining pipeline.
//!
//! # Usage
//!
//! ```bash
//! # Create the state layout under ./pipeline-state
//! renovar init --root pipeline-state
//!
//! # Drop a batch into the pending area
//! renovar ingest batch.csv --root pipeline-state
//!
//! # One full cycle: merge, train, validate, deploy or reject
//! renovar run --root pipeline-state
//!
//! # Keep running every day at 02:00
//! renovar schedule --every daily --at 02:00 --root pipeline-state
//!
//! # Inspect and recover
//! renovar status --root pipeline-state
//! renovar history --limit 5 --root pipeline-state
//! renovar rollback --root pipeline-state
//!
//! # Score customers with the active model
//! renovar score customers.csv --output scored.csv --root pipeline-state
//! ```

use clap::Parser;
use renovar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
