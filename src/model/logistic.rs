//! Logistic regression with balanced class weights.
//!
//! Deterministic full-batch gradient descent on standardized features; the
//! same training data always yields the same coefficients. Balanced
//! weighting gives each class inverse-frequency influence, compensating for
//! how rare delinquency is in the corpus.

use super::{Classifier, ModelError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the weights.
    pub l2: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 300,
            l2: 1e-4,
        }
    }
}

/// Binary logistic regression model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    weights: Vec<f64>,
    bias: f64,
    feature_means: Vec<f64>,
    feature_stds: Vec<f64>,
    fitted: bool,
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            bias: 0.0,
            feature_means: Vec::new(),
            feature_stds: Vec::new(),
            fitted: false,
        }
    }

    /// Build a model from externally supplied coefficients.
    ///
    /// `means`/`stds` are the standardization parameters applied before the
    /// linear term; pass zeros and ones for raw-feature coefficients.
    pub fn from_parameters(
        weights: Vec<f64>,
        bias: f64,
        means: Vec<f64>,
        stds: Vec<f64>,
    ) -> Self {
        Self {
            config: LogisticConfig::default(),
            weights,
            bias,
            feature_means: means,
            feature_stds: stds,
            fitted: true,
        }
    }

    pub fn config(&self) -> &LogisticConfig {
        &self.config
    }

    fn standardized(&self, features: &Array2<f64>) -> Array2<f64> {
        let mut out = features.clone();
        for (j, mut column) in out.columns_mut().into_iter().enumerate() {
            let mean = self.feature_means[j];
            let std = self.feature_stds[j];
            column.mapv_inplace(|v| (v - mean) / std);
        }
        out
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, features: &Array2<f64>, labels: &[u8]) -> Result<()> {
        let rows = features.nrows();
        let cols = features.ncols();
        if rows == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if labels.len() != rows {
            return Err(ModelError::LabelMismatch {
                rows,
                labels: labels.len(),
            });
        }
        let positives = labels.iter().filter(|&&y| y == 1).count();
        let negatives = rows - positives;
        if positives == 0 || negatives == 0 {
            return Err(ModelError::SingleClass);
        }

        let mut means = vec![0.0; cols];
        for row in features.rows() {
            for (j, v) in row.iter().enumerate() {
                means[j] += v;
            }
        }
        for m in &mut means {
            *m /= rows as f64;
        }
        let mut stds = vec![0.0; cols];
        for row in features.rows() {
            for (j, v) in row.iter().enumerate() {
                let d = v - means[j];
                stds[j] += d * d;
            }
        }
        for s in &mut stds {
            *s = (*s / rows as f64).sqrt();
            // a constant column would otherwise divide by zero
            if *s < 1e-12 {
                *s = 1.0;
            }
        }
        self.feature_means = means;
        self.feature_stds = stds;

        let xs = self.standardized(features);
        let y = Array1::from_iter(labels.iter().map(|&v| f64::from(v)));

        // balanced weighting: n / (2 * n_class)
        let w_pos = rows as f64 / (2.0 * positives as f64);
        let w_neg = rows as f64 / (2.0 * negatives as f64);
        let sample_weights =
            Array1::from_iter(labels.iter().map(|&v| if v == 1 { w_pos } else { w_neg }));
        let total_weight = sample_weights.sum();

        let mut weights = Array1::<f64>::zeros(cols);
        let mut bias = 0.0_f64;
        for _ in 0..self.config.epochs {
            let z = xs.dot(&weights) + bias;
            let p = z.mapv(sigmoid);
            let err = (&p - &y) * &sample_weights;
            let grad_w = xs.t().dot(&err) / total_weight + self.config.l2 * &weights;
            let grad_b = err.sum() / total_weight;
            weights = weights - self.config.learning_rate * &grad_w;
            bias -= self.config.learning_rate * grad_b;
        }

        self.weights = weights.to_vec();
        self.bias = bias;
        self.fitted = true;
        Ok(())
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        // a deserialized artifact can carry any length combination
        if self.feature_means.len() != self.weights.len()
            || self.feature_stds.len() != self.weights.len()
        {
            return Err(ModelError::InconsistentParameters {
                weights: self.weights.len(),
                means: self.feature_means.len(),
                stds: self.feature_stds.len(),
            });
        }
        if features.ncols() != self.weights.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.len(),
                got: features.ncols(),
            });
        }
        let xs = self.standardized(features);
        let w = Array1::from_vec(self.weights.clone());
        Ok((xs.dot(&w) + self.bias).mapv(sigmoid))
    }

    fn feature_importance(&self) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ModelError::NotFitted);
        }
        if self.weights.is_empty() {
            return Ok(Vec::new());
        }
        let total: f64 = self.weights.iter().map(|w| w.abs()).sum();
        if total == 0.0 {
            return Ok(vec![1.0 / self.weights.len() as f64; self.weights.len()]);
        }
        Ok(self.weights.iter().map(|w| w.abs() / total).collect())
    }
}
