//! Dataset store: ingestion, merge/dedup, archival, stats.
//!
//! New data arrives as batch files in the pending area. The merge operation
//! folds every pending batch into the canonical corpus (last write wins per
//! identifier), persists the result, and archives the consumed batches so
//! they are never reprocessed. Merge is idempotent: with nothing pending, the
//! existing corpus is returned untouched.

pub mod frame;

pub use frame::{normalize_column, validate_schema, Frame, Record};
pub use frame::{ALL_COLUMNS, FEATURE_COLUMNS, ID_COLUMN, LABEL_COLUMN, REQUIRED_COLUMNS};

use crate::config::Layout;
use crate::oplog::OpLog;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Dataset store errors.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("missing required columns {columns:?} in {path}")]
    MissingColumns { path: String, columns: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;

/// Diagnostic counts for the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub pending_batches: usize,
    pub archived_batches: usize,
    pub corpus_rows: usize,
    pub corpus_updated: Option<DateTime<Utc>>,
}

/// File-backed store for batches and the canonical corpus.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    layout: Layout,
    oplog: OpLog,
}

impl DatasetStore {
    pub fn new(layout: Layout, oplog: OpLog) -> Self {
        Self { layout, oplog }
    }

    /// Pending batch files in arrival order (filenames carry ingest stamps,
    /// so lexicographic order is chronological and the tie-break).
    pub fn list_pending_batches(&self) -> Result<Vec<PathBuf>> {
        let dir = self.layout.pending_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut batches = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            {
                batches.push(path);
            }
        }
        batches.sort();
        Ok(batches)
    }

    /// Validate a raw file and copy it into the pending area under a
    /// timestamped name. Does not trigger a merge.
    pub fn ingest(&self, source: &Path, suggested_name: Option<&str>) -> Result<PathBuf> {
        frame::validate_schema(source)?;
        fs::create_dir_all(self.layout.pending_dir())?;

        let stem = suggested_name
            .map(str::to_string)
            .or_else(|| source.file_stem().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "batch".to_string());
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let mut destination = self.layout.pending_dir().join(format!("{stem}_{stamp}.csv"));
        // Second-resolution stamps collide under rapid ingest.
        let mut attempt = 1;
        while destination.exists() {
            destination = self
                .layout
                .pending_dir()
                .join(format!("{stem}_{stamp}_{attempt}.csv"));
            attempt += 1;
        }
        fs::copy(source, &destination)?;
        self.oplog
            .info("data", &format!("ingested batch {}", destination.display()));
        Ok(destination)
    }

    /// Merge every pending batch into the canonical corpus.
    ///
    /// Concatenates the existing corpus and the batches in arrival order,
    /// deduplicates by identifier keeping the last occurrence, drops rows
    /// missing critical fields, sorts by identifier, persists, then archives
    /// the consumed batches. An archive failure is logged and does not roll
    /// back the merge; the replayed batch is harmless next run because dedup
    /// is idempotent on already-seen identifiers.
    pub fn merge_and_clean(&self) -> Result<Frame> {
        let pending = self.list_pending_batches()?;
        if pending.is_empty() {
            self.oplog.info("data", "no pending batches, corpus unchanged");
            return self.load_corpus();
        }

        let mut records = self.load_corpus()?.records;
        for path in &pending {
            let batch = Frame::load(path)?;
            self.oplog.info(
                "data",
                &format!("loaded batch {} ({} rows)", path.display(), batch.len()),
            );
            records.extend(batch.records);
        }

        let corpus = Frame::new(dedup_and_clean(records));
        corpus.save(&self.layout.corpus_file())?;

        for path in &pending {
            if let Err(e) = self.archive(path) {
                self.oplog
                    .warn("data", &format!("failed to archive {}: {e}", path.display()));
            }
        }
        self.oplog
            .info("data", &format!("merged corpus now {} rows", corpus.len()));
        Ok(corpus)
    }

    /// The persisted corpus, or an empty frame when none exists yet.
    pub fn load_corpus(&self) -> Result<Frame> {
        let path = self.layout.corpus_file();
        if path.exists() {
            Frame::load(&path)
        } else {
            Ok(Frame::default())
        }
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let corpus_path = self.layout.corpus_file();
        let (corpus_rows, corpus_updated) = if corpus_path.exists() {
            let rows = Frame::load(&corpus_path)?.len();
            let modified = fs::metadata(&corpus_path)?
                .modified()
                .ok()
                .map(DateTime::<Utc>::from);
            (rows, modified)
        } else {
            (0, None)
        };
        Ok(StoreStats {
            pending_batches: count_csv_files(&self.layout.pending_dir())?,
            archived_batches: count_csv_files(&self.layout.archive_dir())?,
            corpus_rows,
            corpus_updated,
        })
    }

    fn archive(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(self.layout.archive_dir())?;
        let name = path
            .file_name()
            .ok_or_else(|| DataError::NotFound(path.display().to_string()))?;
        fs::rename(path, self.layout.archive_dir().join(name))?;
        Ok(())
    }
}

/// Dedup by identifier keeping the last occurrence, drop rows missing
/// critical fields, sort by identifier.
///
/// Dedup runs before the critical-field drop: a newer duplicate missing a
/// critical field eliminates the identifier even when an older complete row
/// existed.
pub fn dedup_and_clean(records: Vec<Record>) -> Vec<Record> {
    let mut by_id: HashMap<String, Record> = HashMap::with_capacity(records.len());
    for record in records {
        by_id.insert(record.customer_id.clone(), record);
    }
    let mut rows: Vec<Record> = by_id
        .into_values()
        .filter(|record| record.has_critical_fields())
        .collect();
    rows.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
    rows
}

fn count_csv_files(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            count += 1;
        }
    }
    Ok(count)
}
