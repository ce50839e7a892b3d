//! Sliding Window Extraction
//!
//! Batch extraction over a whole series, live extraction over a short
//! buffer, label alignment and column stacking for the maintenance input.

use ndarray::{concatenate, Array2, ArrayView2, Axis};

use super::layout::FEATURE_COUNT;
use super::stats::WindowStats;
use super::vector::FeatureVector;
use crate::logic::error::{PipelineError, PipelineResult};

/// Smallest usable window (sample std needs two points)
pub const MIN_WINDOW_SIZE: usize = 2;

fn check_window_size(w: usize) -> PipelineResult<()> {
    if w < MIN_WINDOW_SIZE {
        return Err(PipelineError::InsufficientData {
            required: MIN_WINDOW_SIZE,
            actual: w,
        });
    }
    Ok(())
}

/// Summarize every window `[i, i + w)` for `i` in `0..n - w`.
///
/// The result has `n - w` rows; the final full window is not emitted, so
/// each row lines up with the label at `i + w`.
pub fn extract_features(values: &[f64], w: usize) -> PipelineResult<Array2<f64>> {
    check_window_size(w)?;

    let n = values.len();
    if n <= w {
        return Err(PipelineError::InsufficientData {
            required: w + 1,
            actual: n,
        });
    }

    let rows = n - w;
    let mut out = Array2::<f64>::zeros((rows, FEATURE_COUNT));
    let mut sorted = Vec::with_capacity(w);

    for (i, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
        sorted.clear();
        sorted.extend_from_slice(&values[i..i + w]);
        sorted.sort_by(|a, b| a.total_cmp(b));

        let stats = WindowStats::from_sorted(&sorted);
        for (j, v) in stats.to_array().into_iter().enumerate() {
            row[j] = v;
        }
    }

    Ok(out)
}

/// Features of the most recent window of a live buffer.
///
/// Buffers shorter than `w` are padded by repeating their last value;
/// longer buffers contribute only their last `w` points.
pub fn live_features(buffer: &[f64], w: usize) -> PipelineResult<FeatureVector> {
    check_window_size(w)?;

    let last = match buffer.last() {
        Some(v) => *v,
        None => {
            return Err(PipelineError::InsufficientData {
                required: 1,
                actual: 0,
            })
        }
    };

    let mut window: Vec<f64> = if buffer.len() >= w {
        buffer[buffer.len() - w..].to_vec()
    } else {
        let mut padded = buffer.to_vec();
        padded.resize(w, last);
        padded
    };
    window.sort_by(|a, b| a.total_cmp(b));

    Ok(FeatureVector::from_stats(&WindowStats::from_sorted(&window)))
}

/// Live features of the last `count` windows of a buffer, oldest first.
///
/// Row `k` summarizes the buffer as it stood `count - 1 - k` readings
/// ago, padded like `live_features`. Short buffers yield fewer rows.
pub fn live_feature_rows(buffer: &[f64], w: usize, count: usize) -> PipelineResult<Array2<f64>> {
    let rows = count.max(1).min(buffer.len().max(1));
    let first_end = buffer.len().saturating_sub(rows - 1);

    let mut out = Array2::<f64>::zeros((rows, FEATURE_COUNT));
    for (k, mut row) in out.axis_iter_mut(Axis(0)).enumerate() {
        let vector = live_features(&buffer[..first_end + k], w)?;
        for (j, v) in vector.values.into_iter().enumerate() {
            row[j] = v;
        }
    }
    Ok(out)
}

/// Labels aligned with the rows of `extract_features(_, w)`
pub fn align_labels<T>(labels: &[T], w: usize) -> PipelineResult<&[T]> {
    if labels.len() <= w {
        return Err(PipelineError::InsufficientData {
            required: w + 1,
            actual: labels.len(),
        });
    }
    Ok(&labels[w..])
}

/// Column-concatenate feature blocks (one per parameter, canonical order)
pub fn stack_features(blocks: &[Array2<f64>]) -> PipelineResult<Array2<f64>> {
    let first = blocks.first().ok_or(PipelineError::EmptyMatrix)?;
    let rows = first.nrows();

    for block in blocks.iter().skip(1) {
        if block.nrows() != rows {
            return Err(PipelineError::RowMismatch {
                expected: rows,
                actual: block.nrows(),
            });
        }
    }

    let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
    concatenate(Axis(1), &views).map_err(|_| PipelineError::EmptyMatrix)
}
