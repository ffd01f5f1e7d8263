//! Classifier capability and artifact persistence.
//!
//! The pipeline treats the learning algorithm as a capability: anything that
//! can fit on a feature matrix and emit positive-class probabilities. The
//! persisted form is an algorithm-tagged envelope, so artifacts stay
//! self-describing and a new algorithm is one more variant, not a pipeline
//! change.

pub mod logistic;

pub use logistic::{LogisticConfig, LogisticRegression};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Model errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("feature dimension mismatch: model expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("model parameters disagree: {weights} weights vs {means} means and {stds} stds")]
    InconsistentParameters {
        weights: usize,
        means: usize,
        stds: usize,
    },

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("training labels contain a single class")]
    SingleClass,

    #[error("features/labels length mismatch: {rows} rows vs {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Binary classification capability used by the whole pipeline.
pub trait Classifier {
    /// Fit on a feature matrix and binarized labels.
    fn fit(&mut self, features: &Array2<f64>, labels: &[u8]) -> Result<()>;

    /// Positive-class probability per input row.
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>>;

    /// Relative contribution of each input feature, summing to 1.
    fn feature_importance(&self) -> Result<Vec<f64>>;
}

/// Persistable, algorithm-tagged model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticRegression),
}

impl ModelArtifact {
    /// Write the artifact as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Classifier for ModelArtifact {
    fn fit(&mut self, features: &Array2<f64>, labels: &[u8]) -> Result<()> {
        match self {
            ModelArtifact::Logistic(model) => model.fit(features, labels),
        }
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            ModelArtifact::Logistic(model) => model.predict_proba(features),
        }
    }

    fn feature_importance(&self) -> Result<Vec<f64>> {
        match self {
            ModelArtifact::Logistic(model) => model.feature_importance(),
        }
    }
}

/// SHA-256 digest of a file's bytes, hex-encoded.
///
/// Recorded in version metadata at training time and re-checked when the
/// artifact is promoted into the active slot.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.json");
        let model = LogisticRegression::from_parameters(
            vec![1.0, -0.5],
            0.25,
            vec![0.0, 0.0],
            vec![1.0, 1.0],
        );
        let artifact = ModelArtifact::Logistic(model);
        artifact.save(&path).unwrap();

        let features = ndarray::array![[1.0, 2.0], [0.0, 0.0]];
        let original = artifact.predict_proba(&features).unwrap();
        let reloaded = ModelArtifact::load(&path).unwrap();
        let restored = reloaded.predict_proba(&features).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_artifact_json_carries_algorithm_tag() {
        let artifact = ModelArtifact::Logistic(LogisticRegression::from_parameters(
            vec![0.0],
            0.0,
            vec![0.0],
            vec![1.0],
        ));
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("\"algorithm\":\"logistic\""));
    }

    #[test]
    fn test_file_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifact.json");
        fs::write(&path, b"{\"algorithm\":\"logistic\"}").unwrap();
        let digest = file_digest(&path).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));

        fs::write(&path, b"tampered").unwrap();
        assert_ne!(file_digest(&path).unwrap(), digest);
    }
}
