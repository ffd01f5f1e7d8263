//! Append-only operational log.
//!
//! Every component action lands here as one timestamped human-readable line.
//! Log writes must never abort pipeline work; a failed append falls back to
//! stderr and the pipeline carries on.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

/// Handle to the append-only operational log file.
#[derive(Debug, Clone)]
pub struct OpLog {
    path: PathBuf,
}

impl OpLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log a routine component action.
    pub fn info(&self, component: &str, message: &str) {
        self.write("INFO", component, message);
    }

    /// Log a recoverable anomaly (e.g. an archive failure after a merge).
    pub fn warn(&self, component: &str, message: &str) {
        self.write("WARNING", component, message);
    }

    /// Log a failure that aborted a component step.
    pub fn error(&self, component: &str, message: &str) {
        self.write("ERROR", component, message);
    }

    fn write(&self, level: &str, component: &str, message: &str) {
        if let Err(e) = self.append(level, component, message) {
            eprintln!("operational log write failed ({e}): {level} [{component}] {message}");
        }
    }

    fn append(&self, level: &str, component: &str, message: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "{stamp} - {level} - [{component}] {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_appends_timestamped_lines() {
        let dir = TempDir::new().unwrap();
        let log = OpLog::new(dir.path().join("pipeline.log"));
        log.info("data", "merged 540 rows");
        log.error("deploy", "artifact missing");

        let text = std::fs::read_to_string(dir.path().join("pipeline.log")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO - [data] merged 540 rows"));
        assert!(lines[1].contains("ERROR - [deploy] artifact missing"));
    }

    #[test]
    fn test_appends_never_truncate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.log");
        let log = OpLog::new(&path);
        log.info("a", "first");
        drop(log);

        let log = OpLog::new(&path);
        log.info("b", "second");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("first"));
        assert!(text.contains("second"));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("pipeline.log");
        let log = OpLog::new(&path);
        log.warn("data", "archive failed");
        assert!(path.exists());
    }
}
