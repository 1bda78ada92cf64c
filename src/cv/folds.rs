//! Stratified K-fold partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::CvError;

/// One held-out partition of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    /// Dataset row indices: this fold's positives followed by its negatives.
    pub indices: Vec<usize>,
    pub positives: usize,
    pub negatives: usize,
}

impl Fold {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Split `labels` into `k` stratified folds.
///
/// Each class is shuffled on its own (positives with `seed`, negatives with
/// `seed + 1`) and cut into `k` contiguous chunks of `len / k`; the last fold
/// takes the remainder of both classes. The same labels and seed always give
/// the same folds.
pub fn partition(labels: &[u8], k: usize, seed: u64) -> Result<Vec<Fold>, CvError> {
    if k < 2 {
        return Err(CvError::InvalidConfiguration(format!(
            "at least 2 folds are required, got {k}"
        )));
    }
    if let Some((idx, value)) = labels.iter().enumerate().find(|(_, l)| **l > 1) {
        return Err(CvError::InvalidConfiguration(format!(
            "label {value} at index {idx} is not 0 or 1"
        )));
    }

    let (mut positives, mut negatives): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&idx| labels[idx] == 1);
    if k > positives.len() || k > negatives.len() {
        return Err(CvError::InvalidConfiguration(format!(
            "{k} folds cannot be stratified over {} positive and {} negative samples",
            positives.len(),
            negatives.len()
        )));
    }

    positives.shuffle(&mut StdRng::seed_from_u64(seed));
    negatives.shuffle(&mut StdRng::seed_from_u64(seed.wrapping_add(1)));

    let positive_chunks = chunk_bounds(positives.len(), k);
    let negative_chunks = chunk_bounds(negatives.len(), k);
    let folds = positive_chunks
        .into_iter()
        .zip(negative_chunks)
        .enumerate()
        .map(|(index, (pos, neg))| {
            let mut indices = Vec::with_capacity(pos.len() + neg.len());
            indices.extend_from_slice(&positives[pos.clone()]);
            indices.extend_from_slice(&negatives[neg.clone()]);
            Fold {
                index,
                indices,
                positives: pos.len(),
                negatives: neg.len(),
            }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        folds = k,
        seed,
        positives = positives.len(),
        negatives = negatives.len(),
        "Partitioned dataset into stratified folds"
    );
    Ok(folds)
}

/// `k` contiguous ranges of `len / k`, the last one extended to `len`.
fn chunk_bounds(len: usize, k: usize) -> Vec<std::ops::Range<usize>> {
    let size = len / k;
    (0..k)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == k { len } else { start + size };
            start..end
        })
        .collect()
}
