//! Score command implementation

use crate::cli::logging::log;
use crate::cli::{LogLevel, ScoreArgs};
use crate::config::PipelineConfig;
use crate::oplog::OpLog;
use crate::score::Scorer;

pub fn run_score(args: ScoreArgs, config: PipelineConfig, level: LogLevel) -> Result<(), String> {
    if !args.input.exists() {
        return Err(format!("File not found: {}", args.input.display()));
    }

    let oplog = OpLog::new(config.layout().oplog_file());
    let scorer = Scorer::new(&config, oplog);

    let count = scorer
        .score_file(&args.input, &args.output)
        .map_err(|e| format!("Scoring error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("Scored {count} rows -> {}", args.output.display()),
    );
    Ok(())
}
