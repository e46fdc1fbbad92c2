//! Classification metrics over raw class scores.
//!
//! Losses use softmax cross-entropy against a one-hot expansion of the
//! integer targets; the class count is the last dimension of the scores.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewD, Axis};

use crate::error::{DataError, DataResult};

/// Accuracy and loss for one batch of predictions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Fraction of correct predictions, in `[0, 1]`.
    pub accuracy: f32,
    pub sum_loss: f32,
    pub avg_loss: f32,
}

/// Expand integer targets into `[batch, num_classes]`. Out-of-range targets give a zero row.
pub fn one_hot(target: ArrayView1<i64>, num_classes: usize) -> Array2<f32> {
    let mut out = Array2::zeros((target.len(), num_classes));
    for (row, &t) in target.iter().enumerate() {
        if t >= 0 && (t as usize) < num_classes {
            out[[row, t as usize]] = 1.0;
        }
    }
    out
}

/// Per-example softmax cross-entropy between label distributions and logits.
pub fn softmax_cross_entropy(labels: ArrayView2<f32>, logits: ArrayView2<f32>) -> Array1<f32> {
    logits
        .outer_iter()
        .zip(labels.outer_iter())
        .map(|(row, lab)| {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let lse = max + row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln();
            lab.iter()
                .zip(row.iter())
                .map(|(&p, &z)| p * (lse - z))
                .sum::<f32>()
        })
        .collect()
}

/// Index of the highest score in each row; the first maximum wins.
pub fn argmax(scores: ArrayView2<f32>) -> Array1<usize> {
    scores
        .outer_iter()
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Whether each target lies within the `k` highest scores of its row.
///
/// Ties straddling the boundary count as inside. Targets that are out of
/// range or whose score is not finite are never inside.
pub fn in_top_k(scores: ArrayView2<f32>, target: ArrayView1<i64>, k: usize) -> Array1<bool> {
    let num_classes = scores.len_of(Axis(1));
    scores
        .outer_iter()
        .zip(target.iter())
        .map(|(row, &t)| {
            if t < 0 || t as usize >= num_classes {
                return false;
            }
            let score = row[t as usize];
            if !score.is_finite() {
                return false;
            }
            let above = row.iter().filter(|&&v| v > score).count();
            above < k
        })
        .collect()
}

fn check_batch(scores: ArrayView2<f32>, target: ArrayView1<i64>) -> DataResult<()> {
    if scores.nrows() != target.len() {
        return Err(DataError::ShapeMismatch(format!(
            "{} score rows for {} targets",
            scores.nrows(),
            target.len()
        )));
    }
    if scores.ncols() == 0 {
        return Err(DataError::ShapeMismatch("scores have no classes".to_string()));
    }
    Ok(())
}

fn compute_metrics_inner(
    scores: ArrayView2<f32>,
    target: ArrayView1<i64>,
    correct: &Array1<bool>,
) -> Metrics {
    let target_1h = one_hot(target, scores.ncols());
    let losses = softmax_cross_entropy(target_1h.view(), scores);
    let n = losses.len() as f32;
    let sum_loss = losses.sum();
    let hits = correct.iter().filter(|&&c| c).count() as f32;
    // Empty batches give NaN, matching a mean over zero elements.
    Metrics {
        accuracy: hits / n,
        sum_loss,
        avg_loss: sum_loss / n,
    }
}

/// Top-1 accuracy, summed and mean loss.
pub fn compute_metrics(scores: ArrayView2<f32>, target: ArrayView1<i64>) -> DataResult<Metrics> {
    check_batch(scores, target)?;
    let correct: Array1<bool> = argmax(scores)
        .iter()
        .zip(target.iter())
        .map(|(&p, &t)| p as i64 == t)
        .collect();
    Ok(compute_metrics_inner(scores, target, &correct))
}

/// Top-k accuracy, summed and mean loss.
pub fn compute_metrics_topk(
    scores: ArrayView2<f32>,
    target: ArrayView1<i64>,
    k: usize,
) -> DataResult<Metrics> {
    check_batch(scores, target)?;
    let correct = in_top_k(scores, target, k);
    Ok(compute_metrics_inner(scores, target, &correct))
}

/// L2 penalty `sum(v^2) / 2` summed over every array.
pub fn l2_reg_loss<'a, I>(vars: I) -> f32
where
    I: IntoIterator<Item = ArrayViewD<'a, f32>>,
{
    vars.into_iter()
        .map(|v| v.iter().map(|x| x * x).sum::<f32>() / 2.0)
        .sum()
}
