//! Schedule command implementation

use crate::cli::logging::log;
use crate::cli::{LogLevel, ScheduleArgs};
use crate::config::PipelineConfig;
use crate::pipeline::{run_on_cadence, Cadence, Pipeline};
use std::sync::atomic::AtomicBool;

pub fn run_schedule(
    args: ScheduleArgs,
    config: PipelineConfig,
    level: LogLevel,
) -> Result<(), String> {
    let cadence = Cadence::parse(&args.every, &args.at)?;

    log(
        level,
        LogLevel::Normal,
        &format!("Scheduling pipeline runs {cadence}"),
    );
    log(level, LogLevel::Normal, "Press Ctrl-C to stop");

    let pipeline = Pipeline::new(config);
    let stop = AtomicBool::new(false);

    run_on_cadence(cadence, &stop, || {
        let report = pipeline.run();
        log(level, LogLevel::Normal, report.render().trim_end());
    });

    Ok(())
}
