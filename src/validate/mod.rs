//! Candidate validation against the active model.
//!
//! Five independent checks gate a deployment: two absolute floors (accuracy,
//! AUC), two regression checks against the active model, and a prediction
//! drift check. Every check is evaluated and every failure is reported, so an
//! operator sees the full picture in one pass instead of fixing one gate per
//! run. Validation itself never fails: unreadable state turns into failed
//! checks with a reason attached.

use crate::config::{Layout, PipelineConfig};
use crate::data::Frame;
use crate::model::{Classifier, ModelArtifact};
use crate::oplog::OpLog;
use crate::train::{HeldOut, MetricBundle, ModelVersion, VersionMetadata};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Deployment gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    /// Candidate accuracy floor.
    pub min_accuracy: f64,
    /// Candidate AUC floor.
    pub min_auc: f64,
    /// Largest tolerated accuracy drop against the active model.
    pub max_accuracy_drop: f64,
    /// Mean absolute prediction difference at or above this fails the run.
    pub max_drift: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_accuracy: 0.70,
            min_auc: 0.65,
            max_accuracy_drop: 0.05,
            max_drift: 0.15,
        }
    }
}

/// Which rows the drift check scores both models on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DriftReference {
    /// The held-out rows of the current run's stratified split.
    ValidationSplit,
    /// A pinned CSV sample, stable across runs.
    FixedSample { path: PathBuf },
}

impl Default for DriftReference {
    fn default() -> Self {
        Self::ValidationSplit
    }
}

/// Outcome of each gate. A check that could not be evaluated counts as failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationChecks {
    pub min_accuracy: bool,
    pub min_auc: bool,
    pub accuracy_regression: bool,
    pub auc_regression: bool,
    pub drift: bool,
}

impl ValidationChecks {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.min_accuracy
            && self.min_auc
            && self.accuracy_regression
            && self.auc_regression
            && self.drift
    }
}

/// Candidate metrics next to the active model's, with signed deltas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricComparison {
    pub candidate: MetricBundle,
    pub active: MetricBundle,
    pub accuracy_delta: f64,
    pub auc_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Deploy,
    Reject,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => write!(f, "DEPLOY"),
            Self::Reject => write!(f, "REJECT"),
        }
    }
}

/// Full validation verdict for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub candidate_version: ModelVersion,
    /// Absent on the very first run, when nothing is deployed yet.
    pub active_version: Option<ModelVersion>,
    pub checks: ValidationChecks,
    /// Present only when the active model's metrics were readable.
    pub comparison: Option<MetricComparison>,
    /// Mean absolute prediction difference, when both models scored the
    /// reference sample.
    pub drift_score: Option<f64>,
    pub recommendation: Recommendation,
    /// One operator-readable line per failed check.
    pub reasons: Vec<String>,
}

impl ValidationReport {
    #[must_use]
    pub fn should_deploy(&self) -> bool {
        self.recommendation == Recommendation::Deploy
    }

    fn rejected(candidate: ModelVersion, reasons: Vec<String>) -> Self {
        Self {
            candidate_version: candidate,
            active_version: None,
            checks: ValidationChecks::default(),
            comparison: None,
            drift_score: None,
            recommendation: Recommendation::Reject,
            reasons,
        }
    }
}

enum ActiveState {
    Absent,
    Unreadable(String),
    Loaded(VersionMetadata),
}

/// Gates candidates before deployment.
#[derive(Debug, Clone)]
pub struct Validator {
    layout: Layout,
    thresholds: GateThresholds,
    drift_reference: DriftReference,
    oplog: OpLog,
}

impl Validator {
    pub fn new(config: &PipelineConfig, oplog: OpLog) -> Self {
        Self {
            layout: config.layout(),
            thresholds: config.thresholds,
            drift_reference: config.drift_reference.clone(),
            oplog,
        }
    }

    /// Evaluate every gate for `candidate` and return the full verdict.
    ///
    /// `held_out` carries the current run's held-out rows; the drift check
    /// scores both models on them unless a fixed sample is configured.
    pub fn validate(&self, candidate: ModelVersion, held_out: &HeldOut) -> ValidationReport {
        let candidate_meta = match VersionMetadata::load(&self.layout.version_metadata(candidate)) {
            Ok(meta) => meta,
            Err(e) => {
                let reason = format!("candidate {candidate} metadata unreadable: {e}");
                self.oplog.error("validate", &reason);
                return ValidationReport::rejected(candidate, vec![reason]);
            }
        };
        let metrics = candidate_meta.metrics;
        let mut checks = ValidationChecks::default();
        let mut reasons = Vec::new();

        checks.min_accuracy = metrics.accuracy >= self.thresholds.min_accuracy;
        if !checks.min_accuracy {
            reasons.push(format!(
                "accuracy {:.4} below minimum {:.2}",
                metrics.accuracy, self.thresholds.min_accuracy
            ));
        }
        checks.min_auc = metrics.auc >= self.thresholds.min_auc;
        if !checks.min_auc {
            reasons.push(format!(
                "auc {:.4} below minimum {:.2}",
                metrics.auc, self.thresholds.min_auc
            ));
        }

        let mut active_version = None;
        let mut comparison = None;
        let mut drift_score = None;
        match self.load_active() {
            ActiveState::Absent => {
                // first deployment: nothing to regress against or drift from
                checks.accuracy_regression = true;
                checks.auc_regression = true;
                checks.drift = true;
                self.oplog
                    .info("validate", "no active model; comparative checks pass");
            }
            ActiveState::Unreadable(detail) => {
                reasons.push(format!("active model metadata unreadable: {detail}"));
            }
            ActiveState::Loaded(active) => {
                active_version = Some(active.version);
                let accuracy_delta = metrics.accuracy - active.metrics.accuracy;
                let auc_delta = metrics.auc - active.metrics.auc;

                checks.accuracy_regression = accuracy_delta >= -self.thresholds.max_accuracy_drop;
                if !checks.accuracy_regression {
                    reasons.push(format!(
                        "accuracy dropped {:.4} against active {} (limit {:.2})",
                        -accuracy_delta, active.version, self.thresholds.max_accuracy_drop
                    ));
                }
                // any AUC regression fails; ranking quality must not degrade
                checks.auc_regression = auc_delta >= 0.0;
                if !checks.auc_regression {
                    reasons.push(format!(
                        "auc {:.4} regressed below active {} at {:.4}",
                        metrics.auc, active.version, active.metrics.auc
                    ));
                }
                comparison = Some(MetricComparison {
                    candidate: metrics,
                    active: active.metrics,
                    accuracy_delta,
                    auc_delta,
                });

                match self.drift_score(candidate, held_out) {
                    Ok(score) => {
                        drift_score = Some(score);
                        checks.drift = score < self.thresholds.max_drift;
                        if !checks.drift {
                            reasons.push(format!(
                                "prediction drift {:.4} at or above limit {:.2}",
                                score, self.thresholds.max_drift
                            ));
                        }
                    }
                    Err(reason) => reasons.push(reason),
                }
            }
        }

        let recommendation = if checks.all_passed() {
            Recommendation::Deploy
        } else {
            Recommendation::Reject
        };
        for reason in &reasons {
            self.oplog.warn("validate", reason);
        }
        self.oplog.info(
            "validate",
            &format!("candidate {candidate}: {recommendation}"),
        );
        ValidationReport {
            candidate_version: candidate,
            active_version,
            checks,
            comparison,
            drift_score,
            recommendation,
            reasons,
        }
    }

    fn load_active(&self) -> ActiveState {
        let path = self.layout.active_metadata();
        if !path.exists() {
            return ActiveState::Absent;
        }
        match VersionMetadata::load(&path) {
            Ok(meta) => ActiveState::Loaded(meta),
            Err(e) => ActiveState::Unreadable(e.to_string()),
        }
    }

    /// Mean absolute difference between candidate and active probabilities on
    /// the reference sample. Any unreadable input fails the drift check.
    fn drift_score(
        &self,
        candidate: ModelVersion,
        held_out: &HeldOut,
    ) -> std::result::Result<f64, String> {
        let candidate_model = ModelArtifact::load(&self.layout.version_artifact(candidate))
            .map_err(|e| format!("candidate {candidate} artifact unreadable: {e}"))?;
        let active_model = ModelArtifact::load(&self.layout.active_model())
            .map_err(|e| format!("active model artifact unreadable: {e}"))?;
        let reference = self.reference_features(held_out)?;
        if reference.nrows() == 0 {
            return Err("drift reference sample is empty".to_string());
        }
        let candidate_scores = candidate_model
            .predict_proba(&reference)
            .map_err(|e| format!("candidate drift scoring failed: {e}"))?;
        let active_scores = active_model
            .predict_proba(&reference)
            .map_err(|e| format!("active drift scoring failed: {e}"))?;
        let diff = (&candidate_scores - &active_scores).mapv(f64::abs);
        Ok(diff.mean().unwrap_or(0.0))
    }

    fn reference_features(&self, held_out: &HeldOut) -> std::result::Result<Array2<f64>, String> {
        match &self.drift_reference {
            DriftReference::ValidationSplit => Ok(held_out.features.clone()),
            DriftReference::FixedSample { path } => {
                let frame = Frame::load(path)
                    .map_err(|e| format!("drift sample {} unreadable: {e}", path.display()))?;
                Ok(frame.feature_matrix())
            }
        }
    }
}
