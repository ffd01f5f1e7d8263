//! Risk scoring with the active model.
//!
//! Scores are the positive-class probability on a 0-100 scale, one decimal.
//! Tiers bucket the score into the action an analyst takes: `Intervene` at
//! 60 and above, `Engage` at 30 and above, `Monitor` below that. The scored
//! file is the canonical columns plus `risk_score` and `risk_tier`.

use crate::config::{Layout, PipelineConfig};
use crate::data::{frame, DataError, Frame};
use crate::model::{Classifier, ModelArtifact, ModelError};
use crate::oplog::OpLog;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Scoring errors.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("no active model; run the pipeline before scoring")]
    NoActiveModel,

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ScoreError>;

/// Action tier for a 0-100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Intervene,
    Engage,
    Monitor,
}

impl RiskTier {
    #[must_use]
    pub fn for_score(score: f64) -> Self {
        if score >= 60.0 {
            Self::Intervene
        } else if score >= 30.0 {
            Self::Engage
        } else {
            Self::Monitor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intervene => "Intervene",
            Self::Engage => "Engage",
            Self::Monitor => "Monitor",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored customer.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRow {
    pub customer_id: String,
    pub risk_score: f64,
    pub risk_tier: RiskTier,
}

/// Scores tabular input with whatever model is active.
#[derive(Debug, Clone)]
pub struct Scorer {
    layout: Layout,
    oplog: OpLog,
}

impl Scorer {
    pub fn new(config: &PipelineConfig, oplog: OpLog) -> Self {
        Self {
            layout: config.layout(),
            oplog,
        }
    }

    fn active_model(&self) -> Result<ModelArtifact> {
        let path = self.layout.active_model();
        if !path.exists() {
            return Err(ScoreError::NoActiveModel);
        }
        Ok(ModelArtifact::load(&path)?)
    }

    /// Score every row of `frame`, in row order.
    pub fn score_frame(&self, frame: &Frame) -> Result<Vec<ScoredRow>> {
        let model = self.active_model()?;
        if frame.is_empty() {
            return Ok(Vec::new());
        }
        let probabilities = model.predict_proba(&frame.feature_matrix())?;
        Ok(frame
            .records
            .iter()
            .zip(probabilities.iter())
            .map(|(record, &p)| {
                let risk_score = (p * 1000.0).round() / 10.0;
                ScoredRow {
                    customer_id: record.customer_id.clone(),
                    risk_score,
                    risk_tier: RiskTier::for_score(risk_score),
                }
            })
            .collect())
    }

    /// Validate `input` like ingestion does, score it, and write the scored
    /// CSV to `output`. Returns the number of rows scored.
    pub fn score_file(&self, input: &Path, output: &Path) -> Result<usize> {
        frame::validate_schema(input)?;
        let frame = Frame::load(input)?;
        let rows = self.score_frame(&frame)?;

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(output)?;
        let mut header: Vec<&str> = frame::ALL_COLUMNS.to_vec();
        header.push("risk_score");
        header.push("risk_tier");
        writer.write_record(&header)?;
        for (record, scored) in frame.records.iter().zip(&rows) {
            let mut fields: Vec<String> = record.cells().to_vec();
            fields.push(format!("{:.1}", scored.risk_score));
            fields.push(scored.risk_tier.to_string());
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        self.oplog.info(
            "score",
            &format!(
                "scored {} rows from {} into {}",
                rows.len(),
                input.display(),
                output.display()
            ),
        );
        Ok(rows.len())
    }
}
