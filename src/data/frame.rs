//! Canonical tabular schema and CSV handling.
//!
//! Batches arrive as CSV with arbitrary header casing/spacing; loading
//! normalizes column names and coerces numeric cells (malformed or empty
//! cells become missing values). The canonical corpus is written back with a
//! fixed column order so repeated saves of the same rows are byte-identical.

use super::{DataError, Result};
use ndarray::Array2;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Unique-key column.
pub const ID_COLUMN: &str = "customer_id";

/// Columns every ingested batch must carry (after normalization).
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "customer_id",
    "utilisation_pct",
    "avg_payment_ratio",
    "cash_withdrawal_pct",
    "recent_spend_change_pct",
];

/// Model input features, in matrix column order.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "utilisation_pct",
    "avg_payment_ratio",
    "min_due_paid_frequency",
    "merchant_mix_index",
    "cash_withdrawal_pct",
    "recent_spend_change_pct",
];

/// Supervision target: next-period delinquency bucket, binarized as `> 0`.
pub const LABEL_COLUMN: &str = "dpd_bucket_next_month";

/// Every canonical column, in persisted order.
pub const ALL_COLUMNS: [&str; 9] = [
    "customer_id",
    "credit_limit",
    "utilisation_pct",
    "avg_payment_ratio",
    "min_due_paid_frequency",
    "merchant_mix_index",
    "cash_withdrawal_pct",
    "recent_spend_change_pct",
    "dpd_bucket_next_month",
];

/// Normalize a raw column name: trim, lowercase, spaces to underscores,
/// percent signs to `pct`.
pub fn normalize_column(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_").replace('%', "pct")
}

/// One customer-period observation in canonical column order.
///
/// Numeric fields are `None` when the source cell was empty or malformed;
/// [`Record::features`] fills those with 0.0 at matrix-build time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    pub customer_id: String,
    pub credit_limit: Option<f64>,
    pub utilisation_pct: Option<f64>,
    pub avg_payment_ratio: Option<f64>,
    pub min_due_paid_frequency: Option<f64>,
    pub merchant_mix_index: Option<f64>,
    pub cash_withdrawal_pct: Option<f64>,
    pub recent_spend_change_pct: Option<f64>,
    pub dpd_bucket_next_month: Option<f64>,
}

impl Record {
    /// Rows missing an identifier, credit limit, or utilisation are dropped
    /// at merge time.
    pub fn has_critical_fields(&self) -> bool {
        !self.customer_id.trim().is_empty()
            && self.credit_limit.is_some()
            && self.utilisation_pct.is_some()
    }

    /// Binarized label; a missing label counts as the negative class.
    pub fn label(&self) -> u8 {
        u8::from(matches!(self.dpd_bucket_next_month, Some(v) if v > 0.0))
    }

    /// Feature values in [`FEATURE_COLUMNS`] order, missing values as 0.0.
    pub fn features(&self) -> [f64; 6] {
        [
            self.utilisation_pct.unwrap_or(0.0),
            self.avg_payment_ratio.unwrap_or(0.0),
            self.min_due_paid_frequency.unwrap_or(0.0),
            self.merchant_mix_index.unwrap_or(0.0),
            self.cash_withdrawal_pct.unwrap_or(0.0),
            self.recent_spend_change_pct.unwrap_or(0.0),
        ]
    }

    /// Cell values in [`ALL_COLUMNS`] order, missing values as empty cells.
    pub fn cells(&self) -> [String; 9] {
        fn cell(value: Option<f64>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }
        [
            self.customer_id.clone(),
            cell(self.credit_limit),
            cell(self.utilisation_pct),
            cell(self.avg_payment_ratio),
            cell(self.min_due_paid_frequency),
            cell(self.merchant_mix_index),
            cell(self.cash_withdrawal_pct),
            cell(self.recent_spend_change_pct),
            cell(self.dpd_bucket_next_month),
        ]
    }
}

/// An in-memory table of [`Record`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub records: Vec<Record>,
}

impl Frame {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load a CSV file, normalizing headers and coercing numeric cells.
    ///
    /// Columns outside the canonical schema are ignored; canonical columns
    /// absent from the file load as missing values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DataError::NotFound(path.display().to_string()));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let positions = header_positions(reader.headers()?);
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(record_from_row(&row, &positions));
        }
        Ok(Self { records })
    }

    /// Write the frame as CSV with the canonical header, creating parent
    /// directories as needed. Deterministic for a given record sequence.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Feature matrix with one row per record, columns per [`FEATURE_COLUMNS`].
    pub fn feature_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.records.len(), FEATURE_COLUMNS.len()));
        for (i, record) in self.records.iter().enumerate() {
            for (j, value) in record.features().into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }
        matrix
    }

    /// Binarized labels, one per record.
    pub fn labels(&self) -> Vec<u8> {
        self.records.iter().map(Record::label).collect()
    }
}

/// Check that a file carries every required column, without loading rows.
///
/// This is the ingestion surface's hard gate: missing columns are reported
/// before any pipeline state mutates.
pub fn validate_schema(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DataError::NotFound(path.display().to_string()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let present: HashSet<String> = reader.headers()?.iter().map(normalize_column).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(**column))
        .map(|column| (*column).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::MissingColumns {
            path: path.display().to_string(),
            columns: missing,
        })
    }
}

fn header_positions(headers: &csv::StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (normalize_column(h), i))
        .collect()
}

fn record_from_row(row: &csv::StringRecord, positions: &HashMap<String, usize>) -> Record {
    let text = |column: &str| -> &str {
        positions
            .get(column)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
    };
    let numeric = |column: &str| -> Option<f64> {
        let cell = text(column).trim();
        if cell.is_empty() {
            None
        } else {
            cell.parse().ok()
        }
    };
    Record {
        customer_id: text(ID_COLUMN).trim().to_string(),
        credit_limit: numeric("credit_limit"),
        utilisation_pct: numeric("utilisation_pct"),
        avg_payment_ratio: numeric("avg_payment_ratio"),
        min_due_paid_frequency: numeric("min_due_paid_frequency"),
        merchant_mix_index: numeric("merchant_mix_index"),
        cash_withdrawal_pct: numeric("cash_withdrawal_pct"),
        recent_spend_change_pct: numeric("recent_spend_change_pct"),
        dpd_bucket_next_month: numeric(LABEL_COLUMN),
    }
}
