//! Model Module - Detection & Prediction Engines
//!
//! Learning components sit behind two small contracts so they can be
//! swapped without touching the detector / predictor wrappers:
//! - `OutlierModel`: unsupervised fit + outlier flags
//! - `Classifier`: supervised binary fit + probabilities

use ndarray::ArrayView2;

use crate::logic::error::PipelineResult;

pub mod detector;
pub mod forest;
pub mod isolation_forest;
pub mod maintenance;
pub mod scaler;
pub mod sequence;
pub mod storage;

#[cfg(test)]
mod tests;

// Re-export common types
pub use detector::{AnomalyDetector, DetectionMethod};
pub use maintenance::MaintenancePredictor;

/// Unsupervised outlier model
pub trait OutlierModel {
    fn fit(&mut self, x: ArrayView2<f64>) -> PipelineResult<()>;

    /// Higher means more anomalous
    fn score_samples(&self, x: ArrayView2<f64>) -> Vec<f64>;

    fn predict(&self, x: ArrayView2<f64>) -> Vec<bool>;

    /// Width seen during fit (0 before)
    fn n_features(&self) -> usize;
}

/// Supervised binary classifier
pub trait Classifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[bool]) -> PipelineResult<()>;

    /// Probability of the positive class per row
    fn predict_proba(&self, x: ArrayView2<f64>) -> Vec<f64>;

    fn predict(&self, x: ArrayView2<f64>) -> Vec<bool> {
        self.predict_proba(x).into_iter().map(|p| p > 0.5).collect()
    }

    fn n_features(&self) -> usize;
}
