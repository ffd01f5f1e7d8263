//! Run command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::PipelineConfig;
use crate::pipeline::Pipeline;

pub fn run_pipeline(config: PipelineConfig, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Verbose,
        &format!("State root: {}", config.root.display()),
    );

    let pipeline = Pipeline::new(config);
    let report = pipeline.run();
    log(level, LogLevel::Normal, report.render().trim_end());

    // Rejected and skipped runs are legitimate outcomes; only a failed
    // step maps to a non-zero exit.
    if report.is_failure() {
        return Err(report
            .error
            .unwrap_or_else(|| "pipeline run failed".to_string()));
    }
    Ok(())
}
