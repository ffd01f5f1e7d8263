//! History command implementation

use crate::cli::logging::log;
use crate::cli::{HistoryArgs, LogLevel};
use crate::config::PipelineConfig;
use crate::deploy::{Deployer, LedgerAction};
use crate::oplog::OpLog;

pub fn run_history(
    args: HistoryArgs,
    config: PipelineConfig,
    level: LogLevel,
) -> Result<(), String> {
    let oplog = OpLog::new(config.layout().oplog_file());
    let deployer = Deployer::new(&config, oplog);

    let entries = deployer
        .deployment_history(args.limit)
        .map_err(|e| format!("Ledger error: {e}"))?;

    if entries.is_empty() {
        log(level, LogLevel::Normal, "No deployments recorded");
        return Ok(());
    }

    log(
        level,
        LogLevel::Normal,
        &format!("Last {} deployment events:", entries.len()),
    );
    for entry in &entries {
        let when = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
        let line = match (&entry.action, &entry.metrics) {
            (LedgerAction::Deployed, Some(m)) => format!(
                "  {when}  {} deployed (accuracy {:.4}, auc {:.4})",
                entry.version, m.accuracy, m.auc
            ),
            (LedgerAction::Deployed, None) => {
                format!("  {when}  {} deployed", entry.version)
            }
            (LedgerAction::Rollback, _) => {
                format!("  {when}  rolled back to {}", entry.version)
            }
        };
        log(level, LogLevel::Normal, &line);
    }
    Ok(())
}
