//! Seeded class-stratified train/test splitting.

use crate::data::Frame;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

/// Split errors.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("test fraction must be strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),

    #[error("class {class} has only {count} rows; at least 2 are required to stratify")]
    ClassTooSmall { class: u8, count: usize },
}

pub type Result<T> = std::result::Result<T, SplitError>;

/// Row indices of a stratified split, each side sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratify on the binarized label: shuffle each class with a seeded RNG and
/// carve off the rounded test fraction per class, keeping at least one row of
/// every class on each side. Deterministic for a given `(labels, fraction,
/// seed)`, which is what lets training and validation reconstruct the same
/// held-out rows.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [0u8, 1u8] {
        let mut indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| (label != 0) == (class == 1))
            .map(|(i, _)| i)
            .collect();
        let count = indices.len();
        if count < 2 {
            return Err(SplitError::ClassTooSmall { class, count });
        }
        indices.shuffle(&mut rng);
        let take = ((count as f64 * test_fraction).round() as usize).clamp(1, count - 1);
        test.extend_from_slice(&indices[..take]);
        train.extend_from_slice(&indices[take..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(SplitIndices { train, test })
}

/// Held-out features and labels reconstructed from a frame.
#[derive(Debug, Clone)]
pub struct HeldOut {
    pub features: Array2<f64>,
    pub labels: Vec<u8>,
}

/// The held-out side of the stratified split over `frame`, with the same
/// `(fraction, seed)` convention the trainer uses.
pub fn held_out(frame: &Frame, test_fraction: f64, seed: u64) -> Result<HeldOut> {
    let labels = frame.labels();
    let split = stratified_split(&labels, test_fraction, seed)?;
    let features = frame.feature_matrix();
    Ok(HeldOut {
        features: features.select(Axis(0), &split.test),
        labels: split.test.iter().map(|&i| labels[i]).collect(),
    })
}
