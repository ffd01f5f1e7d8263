//! Persisted per-version metadata records.

use super::metrics::{Evaluation, MetricBundle};
use super::version::ModelVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Metadata persistence errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed metadata: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// One model version's record.
///
/// Immutable once written, except `deployed`/`deployment_date`, which the
/// deployer flips when the version is promoted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub version: ModelVersion,
    pub training_date: DateTime<Utc>,
    /// Corpus rows the version was trained from.
    pub data_size: usize,
    pub metrics: MetricBundle,
    pub feature_importance: BTreeMap<String, f64>,
    /// `[[tn, fp], [fn, tp]]` on the held-out split.
    pub confusion_matrix: [[u64; 2]; 2],
    /// SHA-256 of the persisted artifact file, checked again at deploy time.
    pub artifact_sha256: String,
    pub deployed: bool,
    pub deployment_date: Option<DateTime<Utc>>,
}

impl VersionMetadata {
    pub fn from_evaluation(
        version: ModelVersion,
        evaluation: &Evaluation,
        data_size: usize,
        artifact_sha256: String,
    ) -> Self {
        Self {
            version,
            training_date: Utc::now(),
            data_size,
            metrics: evaluation.metrics,
            feature_importance: evaluation.feature_importance.clone(),
            confusion_matrix: evaluation.confusion.to_rows(),
            artifact_sha256,
            deployed: false,
            deployment_date: None,
        }
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> VersionMetadata {
        VersionMetadata {
            version: ModelVersion::new(1, 2),
            training_date: Utc::now(),
            data_size: 540,
            metrics: MetricBundle {
                accuracy: 0.82,
                precision: 0.74,
                recall: 0.69,
                f1: 0.71,
                auc: 0.88,
            },
            feature_importance: BTreeMap::from([
                ("utilisation_pct".to_string(), 0.6),
                ("cash_withdrawal_pct".to_string(), 0.4),
            ]),
            confusion_matrix: [[70, 8], [12, 18]],
            artifact_sha256: "ab".repeat(32),
            deployed: false,
            deployment_date: None,
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata").join("model_v1_2.json");
        let metadata = sample();
        metadata.save(&path).unwrap();

        let loaded = VersionMetadata::load(&path).unwrap();
        assert_eq!(loaded.version, metadata.version);
        assert_eq!(loaded.data_size, 540);
        assert_eq!(loaded.metrics.auc, 0.88);
        assert_eq!(loaded.confusion_matrix, [[70, 8], [12, 18]]);
        assert!(!loaded.deployed);
        assert!(loaded.deployment_date.is_none());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string_pretty(&sample()).unwrap();
        assert!(json.contains("\"version\": \"1.2\""));
        assert!(json.contains("\"deployment_date\": null"));
        assert!(json.contains("\"feature_importance\""));
    }

    #[test]
    fn test_malformed_metadata_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            VersionMetadata::load(&path),
            Err(MetadataError::Malformed(_))
        ));
    }
}
