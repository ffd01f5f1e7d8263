//! Init command implementation

use crate::cli::logging::log;
use crate::cli::{InitArgs, LogLevel};
use crate::config::PipelineConfig;
use crate::data::{dedup_and_clean, validate_schema, Frame};

pub fn run_init(args: InitArgs, config: PipelineConfig, level: LogLevel) -> Result<(), String> {
    let layout = config.layout();
    layout.ensure().map_err(|e| format!("Layout error: {e}"))?;
    log(
        level,
        LogLevel::Normal,
        &format!("Initialized state layout under {}", config.root.display()),
    );

    let Some(seed) = &args.corpus else {
        return Ok(());
    };
    if !seed.exists() {
        return Err(format!("File not found: {}", seed.display()));
    }
    if layout.corpus_file().exists() {
        // Re-running init must never clobber accumulated data.
        log(
            level,
            LogLevel::Normal,
            "Corpus already present; seed file ignored",
        );
        return Ok(());
    }

    validate_schema(seed).map_err(|e| format!("Data error: {e}"))?;
    let frame = Frame::load(seed).map_err(|e| format!("Data error: {e}"))?;
    let cleaned = Frame::new(dedup_and_clean(frame.records));
    cleaned
        .save(&layout.corpus_file())
        .map_err(|e| format!("Data error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("Seeded corpus with {} rows", cleaned.len()),
    );
    Ok(())
}
