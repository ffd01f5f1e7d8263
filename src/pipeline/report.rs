//! Structured execution report.
//!
//! Every run produces one report, however far it got: deployed, rejected
//! with the validator's reasons, skipped for lack of new data, or failed
//! with a top-level error. A partial report is a valid outcome, not an
//! error.

use crate::train::{MetricBundle, ModelVersion};
use crate::validate::ValidationReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// A candidate passed every gate and is now active.
    Deployed,
    /// A candidate was trained but failed validation; the active slot is
    /// unchanged.
    Rejected,
    /// No pending batches; nothing ran.
    Skipped,
    /// A step failed; see `error`.
    Failed,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Deployed => "DEPLOYED",
            Self::Rejected => "REJECTED",
            Self::Skipped => "SKIPPED",
            Self::Failed => "FAILED",
        };
        write!(f, "{label}")
    }
}

/// Accumulated outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub outcome: RunOutcome,
    /// Batches found pending when the run started; a failed merge leaves
    /// them in place for the next run.
    pub pending_batches: usize,
    pub corpus_rows: usize,
    pub trained_version: Option<ModelVersion>,
    pub metrics: Option<MetricBundle>,
    pub validation: Option<ValidationReport>,
    pub error: Option<String>,
}

impl RunReport {
    /// Fresh report. The outcome stays `Failed` until a terminal state is
    /// recorded, so an abandoned report never reads as success.
    pub fn begin() -> Self {
        Self {
            started: Utc::now(),
            finished: None,
            outcome: RunOutcome::Failed,
            pending_batches: 0,
            corpus_rows: 0,
            trained_version: None,
            metrics: None,
            validation: None,
            error: None,
        }
    }

    pub fn complete(&mut self, outcome: RunOutcome) {
        self.outcome = outcome;
        self.finished = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.complete(RunOutcome::Failed);
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome == RunOutcome::Failed
    }

    /// Operator-facing summary, one field per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Pipeline run at {}",
            self.started.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "  outcome:  {}", self.outcome);
        if self.outcome != RunOutcome::Skipped {
            let _ = writeln!(out, "  batches:  {} found", self.pending_batches);
            let _ = writeln!(out, "  corpus:   {} rows", self.corpus_rows);
        }
        if let Some(version) = self.trained_version {
            match self.metrics {
                Some(m) => {
                    let _ = writeln!(
                        out,
                        "  version:  {version} (accuracy {:.4}, auc {:.4})",
                        m.accuracy, m.auc
                    );
                }
                None => {
                    let _ = writeln!(out, "  version:  {version}");
                }
            }
        }
        if let Some(validation) = &self.validation {
            let _ = writeln!(out, "  verdict:  {}", validation.recommendation);
            if let Some(drift) = validation.drift_score {
                let _ = writeln!(out, "  drift:    {drift:.4}");
            }
            if !validation.reasons.is_empty() {
                let _ = writeln!(out, "  reasons:");
                for reason in &validation.reasons {
                    let _ = writeln!(out, "    - {reason}");
                }
            }
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "  error:    {error}");
        }
        out
    }
}
