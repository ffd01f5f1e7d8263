//! Ingest command implementation

use crate::cli::logging::log;
use crate::cli::{IngestArgs, LogLevel};
use crate::config::PipelineConfig;
use crate::data::DatasetStore;
use crate::oplog::OpLog;

pub fn run_ingest(args: IngestArgs, config: PipelineConfig, level: LogLevel) -> Result<(), String> {
    if !args.file.exists() {
        return Err(format!("File not found: {}", args.file.display()));
    }

    let layout = config.layout();
    layout.ensure().map_err(|e| format!("Layout error: {e}"))?;
    let store = DatasetStore::new(layout, OpLog::new(config.layout().oplog_file()));

    let stored = store
        .ingest(&args.file, args.name.as_deref())
        .map_err(|e| format!("Ingest error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("Ingested {} -> {}", args.file.display(), stored.display()),
    );
    Ok(())
}
