//! Model training: stratified split, class-weighted fit, metric bundle,
//! monotone version assignment, append-only persistence.
//!
//! Any failure between the split and the metric computation aborts the whole
//! attempt; nothing is persisted for an aborted run, so every version on disk
//! is complete and reachable.

pub mod metadata;
pub mod metrics;
pub mod split;
pub mod version;

pub use metadata::{MetadataError, VersionMetadata};
pub use metrics::{
    class_metrics, classification_report, roc_auc, ClassMetrics, ClassificationReport,
    ConfusionMatrix, Evaluation, MetricBundle,
};
pub use split::{held_out, stratified_split, HeldOut, SplitError, SplitIndices};
pub use version::{ModelVersion, ParseVersionError};

use crate::config::{Layout, PipelineConfig};
use crate::data::{Frame, FEATURE_COLUMNS};
use crate::model::{
    file_digest, Classifier, LogisticConfig, LogisticRegression, ModelArtifact, ModelError,
};
use crate::oplog::OpLog;
use ndarray::Axis;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Training errors.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("corpus is empty")]
    EmptyCorpus,

    #[error("version {0} is already persisted")]
    VersionCollision(ModelVersion),

    #[error("metric '{metric}' is undefined on the held-out split")]
    MetricUndefined { metric: &'static str },

    #[error("split failed: {0}")]
    Split(#[from] SplitError),

    #[error("classifier error: {0}")]
    Model(#[from] ModelError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrainError>;

/// Scan persisted artifact filenames and return the next free version:
/// latest version's minor plus one, or 1.0 when nothing is persisted yet.
pub fn next_version(versions_dir: &Path) -> std::io::Result<ModelVersion> {
    if !versions_dir.exists() {
        return Ok(ModelVersion::INITIAL);
    }
    let mut latest: Option<ModelVersion> = None;
    for entry in fs::read_dir(versions_dir)? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(found) = ModelVersion::from_file_stem(stem) {
            latest = Some(latest.map_or(found, |best| best.max(found)));
        }
    }
    Ok(latest.map_or(ModelVersion::INITIAL, ModelVersion::next_minor))
}

/// Everything a successful training run hands back to the scheduler.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub artifact: ModelArtifact,
    pub evaluation: Evaluation,
    pub version: ModelVersion,
}

/// Trains candidates from the canonical corpus.
#[derive(Debug, Clone)]
pub struct Trainer {
    layout: Layout,
    test_fraction: f64,
    seed: u64,
    classifier: LogisticConfig,
    oplog: OpLog,
}

impl Trainer {
    pub fn new(config: &PipelineConfig, oplog: OpLog) -> Self {
        Self {
            layout: config.layout(),
            test_fraction: config.test_fraction,
            seed: config.seed,
            classifier: config.classifier.clone(),
            oplog,
        }
    }

    /// Train a candidate on the corpus, evaluate it on the held-out split,
    /// and persist artifact + metadata under the next version.
    pub fn train(&self, corpus: &Frame) -> Result<TrainOutcome> {
        if corpus.is_empty() {
            return Err(TrainError::EmptyCorpus);
        }
        let features = corpus.feature_matrix();
        let labels = corpus.labels();
        let split = stratified_split(&labels, self.test_fraction, self.seed)?;
        let x_train = features.select(Axis(0), &split.train);
        let y_train: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();
        let x_test = features.select(Axis(0), &split.test);
        let y_test: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();

        let mut model = LogisticRegression::new(self.classifier.clone());
        model.fit(&x_train, &y_train)?;

        let scores = model.predict_proba(&x_test)?.to_vec();
        let predicted: Vec<u8> = scores.iter().map(|&p| u8::from(p >= 0.5)).collect();
        let confusion = ConfusionMatrix::from_labels(&y_test, &predicted);
        let auc =
            roc_auc(&y_test, &scores).ok_or(TrainError::MetricUndefined { metric: "auc" })?;
        let positive = class_metrics(&confusion, 1);
        let metric_bundle = MetricBundle {
            accuracy: confusion.accuracy(),
            precision: positive.precision,
            recall: positive.recall,
            f1: positive.f1,
            auc,
        };

        let train_predicted: Vec<u8> = model
            .predict_proba(&x_train)?
            .iter()
            .map(|&p| u8::from(p >= 0.5))
            .collect();
        let train_accuracy = ConfusionMatrix::from_labels(&y_train, &train_predicted).accuracy();

        let feature_importance: BTreeMap<String, f64> = FEATURE_COLUMNS
            .iter()
            .map(|column| (*column).to_string())
            .zip(model.feature_importance()?)
            .collect();

        let evaluation = Evaluation {
            metrics: metric_bundle,
            confusion,
            report: classification_report(&confusion),
            train_accuracy,
            feature_importance,
            test_rows: y_test.len(),
        };

        let version = next_version(&self.layout.versions_dir())?;
        let artifact = ModelArtifact::Logistic(model);
        self.persist(&artifact, &evaluation, corpus.len(), version)?;
        self.oplog.info(
            "train",
            &format!(
                "trained version {version} on {} rows (accuracy {:.4}, auc {:.4})",
                corpus.len(),
                metric_bundle.accuracy,
                metric_bundle.auc
            ),
        );
        Ok(TrainOutcome {
            artifact,
            evaluation,
            version,
        })
    }

    fn persist(
        &self,
        artifact: &ModelArtifact,
        evaluation: &Evaluation,
        data_size: usize,
        version: ModelVersion,
    ) -> Result<()> {
        let artifact_path = self.layout.version_artifact(version);
        let metadata_path = self.layout.version_metadata(version);
        // append-only: an existing version is never overwritten
        if artifact_path.exists() || metadata_path.exists() {
            return Err(TrainError::VersionCollision(version));
        }
        artifact.save(&artifact_path)?;
        let digest = file_digest(&artifact_path)?;
        let metadata = VersionMetadata::from_evaluation(version, evaluation, data_size, digest);
        if let Err(e) = metadata.save(&metadata_path) {
            // no half-persisted version: drop the artifact written above
            let _ = fs::remove_file(&artifact_path);
            return Err(e.into());
        }
        Ok(())
    }
}
