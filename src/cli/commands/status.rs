//! Status command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::PipelineConfig;
use crate::data::DatasetStore;
use crate::deploy::Deployer;
use crate::oplog::OpLog;

pub fn run_status(config: PipelineConfig, level: LogLevel) -> Result<(), String> {
    let oplog = OpLog::new(config.layout().oplog_file());
    let store = DatasetStore::new(config.layout(), oplog.clone());
    let deployer = Deployer::new(&config, oplog);

    let stats = store.stats().map_err(|e| format!("Data error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("State root: {}", config.root.display()),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  corpus:   {} rows", stats.corpus_rows),
    );
    if let Some(updated) = stats.corpus_updated {
        log(
            level,
            LogLevel::Verbose,
            &format!("  updated:  {}", updated.format("%Y-%m-%d %H:%M:%S UTC")),
        );
    }
    log(
        level,
        LogLevel::Normal,
        &format!("  pending:  {} batches", stats.pending_batches),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("  archived: {} batches", stats.archived_batches),
    );

    match deployer.active_model_info() {
        Some(meta) => {
            log(
                level,
                LogLevel::Normal,
                &format!(
                    "  active:   version {} (accuracy {:.4}, auc {:.4})",
                    meta.version, meta.metrics.accuracy, meta.metrics.auc
                ),
            );
            if let Some(date) = meta.deployment_date {
                log(
                    level,
                    LogLevel::Verbose,
                    &format!("  deployed: {}", date.format("%Y-%m-%d %H:%M:%S UTC")),
                );
            }
        }
        None => log(level, LogLevel::Normal, "  active:   none"),
    }
    Ok(())
}
