//! Rollback command implementation

use crate::cli::logging::log;
use crate::cli::{LogLevel, RollbackArgs};
use crate::config::PipelineConfig;
use crate::deploy::Deployer;
use crate::oplog::OpLog;

pub fn run_rollback(
    args: RollbackArgs,
    config: PipelineConfig,
    level: LogLevel,
) -> Result<(), String> {
    let oplog = OpLog::new(config.layout().oplog_file());
    let deployer = Deployer::new(&config, oplog);

    match &args.version {
        Some(version) => log(
            level,
            LogLevel::Verbose,
            &format!("Rolling back to requested version {version}"),
        ),
        None => log(
            level,
            LogLevel::Verbose,
            "Rolling back to the previously deployed version",
        ),
    }

    let restored = deployer
        .rollback(args.version)
        .map_err(|e| format!("Rollback error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("Rolled back: version {restored} is active again"),
    );
    Ok(())
}
