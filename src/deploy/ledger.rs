//! Append-only deployment ledger.
//!
//! One JSON object per line in `logs/deployments.jsonl`. Entries are only
//! ever appended; rollback history stays visible forever. The second-to-last
//! entry names the version a rollback returns to.

use crate::train::{MetricBundle, ModelVersion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("I/O error on ledger {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("corrupt ledger entry at line {line}: {detail}")]
    Corrupt { line: usize, detail: String },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// What put a version into the active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Deployed,
    Rollback,
}

/// One line of the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: ModelVersion,
    pub action: LedgerAction,
    pub timestamp: DateTime<Utc>,
    /// Validation-time metrics for deployments; absent for rollbacks.
    pub metrics: Option<MetricBundle>,
}

impl LedgerEntry {
    pub fn new(version: ModelVersion, action: LedgerAction, metrics: Option<MetricBundle>) -> Self {
        Self {
            version,
            action,
            timestamp: Utc::now(),
            metrics,
        }
    }
}

/// Append-only history of everything that reached the active slot.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_err(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Append one entry. Never rewrites existing lines.
    pub fn append(&self, entry: &LedgerEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let line = serde_json::to_string(entry).map_err(|e| LedgerError::Corrupt {
            line: 0,
            detail: e.to_string(),
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        writeln!(file, "{line}").map_err(|e| self.io_err(e))?;
        Ok(())
    }

    /// All entries, oldest first. A missing ledger is an empty history.
    pub fn entries(&self) -> Result<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        let mut entries = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry =
                serde_json::from_str(line).map_err(|e| LedgerError::Corrupt {
                    line: i + 1,
                    detail: e.to_string(),
                })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// The most recent entries, oldest first.
    pub fn tail(&self, limit: usize) -> Result<Vec<LedgerEntry>> {
        let mut entries = self.entries()?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    /// The version a rollback would return to: the second-to-last entry.
    /// `None` when fewer than two deployments ever happened.
    pub fn previous_version(&self) -> Result<Option<ModelVersion>> {
        let entries = self.entries()?;
        if entries.len() < 2 {
            return Ok(None);
        }
        Ok(Some(entries[entries.len() - 2].version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ledger(dir: &TempDir) -> Ledger {
        Ledger::new(dir.path().join("deployments.jsonl"))
    }

    fn entry(major: u32, minor: u32, action: LedgerAction) -> LedgerEntry {
        LedgerEntry::new(ModelVersion::new(major, minor), action, None)
    }

    #[test]
    fn test_missing_ledger_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        assert!(ledger.entries().unwrap().is_empty());
        assert_eq!(ledger.previous_version().unwrap(), None);
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        ledger.append(&entry(1, 0, LedgerAction::Deployed)).unwrap();
        ledger.append(&entry(1, 1, LedgerAction::Deployed)).unwrap();
        ledger.append(&entry(1, 0, LedgerAction::Rollback)).unwrap();

        let entries = ledger.entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].version, ModelVersion::new(1, 0));
        assert_eq!(entries[1].version, ModelVersion::new(1, 1));
        assert_eq!(entries[2].action, LedgerAction::Rollback);
    }

    #[test]
    fn test_previous_version_is_second_to_last() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        ledger.append(&entry(1, 0, LedgerAction::Deployed)).unwrap();
        assert_eq!(ledger.previous_version().unwrap(), None);

        ledger.append(&entry(1, 1, LedgerAction::Deployed)).unwrap();
        assert_eq!(
            ledger.previous_version().unwrap(),
            Some(ModelVersion::new(1, 0))
        );

        ledger.append(&entry(1, 2, LedgerAction::Deployed)).unwrap();
        assert_eq!(
            ledger.previous_version().unwrap(),
            Some(ModelVersion::new(1, 1))
        );
    }

    #[test]
    fn test_tail_returns_most_recent() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        for minor in 0..5 {
            ledger
                .append(&entry(1, minor, LedgerAction::Deployed))
                .unwrap();
        }
        let tail = ledger.tail(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].version, ModelVersion::new(1, 3));
        assert_eq!(tail[1].version, ModelVersion::new(1, 4));

        assert_eq!(ledger.tail(100).unwrap().len(), 5);
    }

    #[test]
    fn test_entry_line_shape() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        let metrics = MetricBundle {
            accuracy: 0.8,
            precision: 0.7,
            recall: 0.6,
            f1: 0.65,
            auc: 0.75,
        };
        ledger
            .append(&LedgerEntry::new(
                ModelVersion::new(1, 2),
                LedgerAction::Deployed,
                Some(metrics),
            ))
            .unwrap();
        ledger.append(&entry(1, 1, LedgerAction::Rollback)).unwrap();

        let text = std::fs::read_to_string(dir.path().join("deployments.jsonl")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""version":"1.2""#));
        assert!(lines[0].contains(r#""action":"deployed""#));
        assert!(lines[1].contains(r#""action":"rollback""#));
        assert!(lines[1].contains(r#""metrics":null"#));
    }

    #[test]
    fn test_corrupt_line_reported_with_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deployments.jsonl");
        let ledger = Ledger::new(&path);
        ledger.append(&entry(1, 0, LedgerAction::Deployed)).unwrap();
        std::fs::write(
            &path,
            format!(
                "{}\nnot json\n",
                std::fs::read_to_string(&path).unwrap().trim_end()
            ),
        )
        .unwrap();

        let err = ledger.entries().unwrap_err();
        match err {
            LedgerError::Corrupt { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deployments.jsonl");
        let ledger = Ledger::new(&path);
        ledger.append(&entry(1, 0, LedgerAction::Deployed)).unwrap();
        let mut text = std::fs::read_to_string(&path).unwrap();
        text.push('\n');
        std::fs::write(&path, text).unwrap();

        assert_eq!(ledger.entries().unwrap().len(), 1);
    }
}
