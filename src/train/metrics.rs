//! Binary classification metrics.
//!
//! Confusion-matrix scores plus a rank-based AUC, following scikit-learn's
//! binary conventions: positive class = 1, zero denominators score 0.0
//! rather than NaN.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 2x2 confusion matrix. Rows are truth, columns are prediction, class
/// order `[negative, positive]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    rows: [[u64; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Self {
        let mut rows = [[0u64; 2]; 2];
        for (&t, &p) in truth.iter().zip(predicted) {
            rows[usize::from(t != 0)][usize::from(p != 0)] += 1;
        }
        Self { rows }
    }

    pub fn true_negatives(&self) -> u64 {
        self.rows[0][0]
    }

    pub fn false_positives(&self) -> u64 {
        self.rows[0][1]
    }

    pub fn false_negatives(&self) -> u64 {
        self.rows[1][0]
    }

    pub fn true_positives(&self) -> u64 {
        self.rows[1][1]
    }

    /// Number of truth rows for a class.
    pub fn support(&self, class: u8) -> u64 {
        let row = self.rows[usize::from(class != 0)];
        row[0] + row[1]
    }

    pub fn total(&self) -> u64 {
        self.support(0) + self.support(1)
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_negatives() + self.true_positives()) as f64 / total as f64
    }

    /// Raw counts in serialization order `[[tn, fp], [fn, tp]]`.
    pub fn to_rows(&self) -> [[u64; 2]; 2] {
        self.rows
    }
}

/// Precision/recall/F1/support for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

impl ClassMetrics {
    fn from_counts(tp: u64, fp: u64, fn_: u64, support: u64) -> Self {
        let precision = if tp + fp == 0 {
            0.0
        } else {
            tp as f64 / (tp + fp) as f64
        };
        let recall = if tp + fn_ == 0 {
            0.0
        } else {
            tp as f64 / (tp + fn_) as f64
        };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Self {
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Per-class metrics, treating `class` as the positive side.
pub fn class_metrics(cm: &ConfusionMatrix, class: u8) -> ClassMetrics {
    let (tp, fp, fn_) = if class != 0 {
        (
            cm.true_positives(),
            cm.false_positives(),
            cm.false_negatives(),
        )
    } else {
        (
            cm.true_negatives(),
            cm.false_negatives(),
            cm.false_positives(),
        )
    };
    ClassMetrics::from_counts(tp, fp, fn_, cm.support(class))
}

/// Per-class breakdown with macro and support-weighted averages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

pub fn classification_report(cm: &ConfusionMatrix) -> ClassificationReport {
    let neg = class_metrics(cm, 0);
    let pos = class_metrics(cm, 1);
    let total = cm.total();
    let macro_avg = ClassMetrics {
        precision: (neg.precision + pos.precision) / 2.0,
        recall: (neg.recall + pos.recall) / 2.0,
        f1: (neg.f1 + pos.f1) / 2.0,
        support: total,
    };
    let weighted = |a: f64, b: f64| {
        if total == 0 {
            0.0
        } else {
            (a * neg.support as f64 + b * pos.support as f64) / total as f64
        }
    };
    ClassificationReport {
        classes: BTreeMap::from([("0".to_string(), neg), ("1".to_string(), pos)]),
        accuracy: cm.accuracy(),
        macro_avg,
        weighted_avg: ClassMetrics {
            precision: weighted(neg.precision, pos.precision),
            recall: weighted(neg.recall, pos.recall),
            f1: weighted(neg.f1, pos.f1),
            support: total,
        },
    }
}

/// Probability-based ROC AUC via the rank statistic, averaging ranks over
/// tied scores. `None` when the labels contain a single class.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n = labels.len();
    if n == 0 || n != scores.len() {
        return None;
    }
    let positives = labels.iter().filter(|&&y| y != 0).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // 1-based average ranks over tied scores
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg = (i + j + 2) as f64 / 2.0;
        for k in i..=j {
            ranks[order[k]] = avg;
        }
        i = j + 1;
    }

    let rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y != 0)
        .map(|(_, &r)| r)
        .sum();
    let u = rank_sum - (positives * (positives + 1)) as f64 / 2.0;
    Some(u / (positives as f64 * negatives as f64))
}

/// The five headline metrics persisted with every version.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: f64,
}

/// Full evaluation of a trained candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Held-out metrics; precision/recall/F1 are for the positive class.
    pub metrics: MetricBundle,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
    /// In-sample accuracy, for spotting over/underfit at a glance.
    pub train_accuracy: f64,
    pub feature_importance: BTreeMap<String, f64>,
    pub test_rows: usize,
}
