//! Pipeline configuration and persisted-state layout.
//!
//! One [`PipelineConfig`] drives every component: where state lives on disk,
//! how the corpus is split, which thresholds gate a deployment, and where
//! drift is measured. Configs load from a JSON file; CLI flags override
//! individual fields after loading.

use crate::model::LogisticConfig;
use crate::train::ModelVersion;
use crate::validate::{DriftReference, GateThresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Unreadable { path: String, source: io::Error },

    #[error("malformed config file {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },

    #[error("test_fraction must be strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),

    #[error("threshold {name} must be within [0, 1], got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory holding all pipeline state.
    pub root: PathBuf,
    /// Held-out fraction for the stratified train/test split.
    pub test_fraction: f64,
    /// Seed for the stratified split; training and validation reuse it so
    /// both see the same held-out rows.
    pub seed: u64,
    /// Deployment gate thresholds.
    pub thresholds: GateThresholds,
    /// Classifier hyperparameters.
    pub classifier: LogisticConfig,
    /// Where drift is measured: the validation split or a fixed sample file.
    pub drift_reference: DriftReference,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            test_fraction: 0.2,
            seed: 42,
            thresholds: GateThresholds::default(),
            classifier: LogisticConfig::default(),
            drift_reference: DriftReference::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an optional file, falling back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Reject out-of-range fractions and thresholds before any component runs.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::InvalidFraction(self.test_fraction));
        }
        let t = &self.thresholds;
        for (name, value) in [
            ("min_accuracy", t.min_accuracy),
            ("min_auc", t.min_auc),
            ("max_accuracy_drop", t.max_accuracy_drop),
            ("max_drift", t.max_drift),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }

    /// Replace the state root, e.g. from a CLI flag.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Derived filesystem layout under the configured root.
    pub fn layout(&self) -> Layout {
        Layout::new(&self.root)
    }
}

/// Filesystem layout of all persisted pipeline state, derived from one root.
///
/// ```text
/// root/
///   data/pending/           batches awaiting merge
///   data/archive/           consumed batches
///   data/corpus.csv         canonical corpus
///   models/versions/        one artifact per trained version
///   models/metadata/        one metadata record per trained version
///   models/active/          active model + metadata + timestamped backups
///   logs/deployments.jsonl  deployment ledger
///   logs/pipeline.log       operational log
///   run.lock                present only while a pipeline run is live
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pending_dir(&self) -> PathBuf {
        self.root.join("data").join("pending")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("data").join("archive")
    }

    pub fn corpus_file(&self) -> PathBuf {
        self.root.join("data").join("corpus.csv")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("models").join("versions")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join("models").join("metadata")
    }

    pub fn active_dir(&self) -> PathBuf {
        self.root.join("models").join("active")
    }

    pub fn active_model(&self) -> PathBuf {
        self.active_dir().join("model.json")
    }

    pub fn active_metadata(&self) -> PathBuf {
        self.active_dir().join("metadata.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.logs_dir().join("deployments.jsonl")
    }

    pub fn oplog_file(&self) -> PathBuf {
        self.logs_dir().join("pipeline.log")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join("run.lock")
    }

    /// Artifact path for a persisted version, e.g. `models/versions/model_v1_2.json`.
    pub fn version_artifact(&self, version: ModelVersion) -> PathBuf {
        self.versions_dir().join(format!("{}.json", version.file_stem()))
    }

    /// Metadata path for a persisted version, e.g. `models/metadata/model_v1_2.json`.
    pub fn version_metadata(&self, version: ModelVersion) -> PathBuf {
        self.metadata_dir().join(format!("{}.json", version.file_stem()))
    }

    /// Create every directory of the layout. Idempotent.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [
            self.pending_dir(),
            self.archive_dir(),
            self.versions_dir(),
            self.metadata_dir(),
            self.active_dir(),
            self.logs_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
