//! Standard Scaler
//!
//! Per-column zero mean / unit variance. Population std; constant columns
//! keep a scale of 1 so they pass through centered.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::logic::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.mean.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn fit(&mut self, x: ArrayView2<f64>) -> PipelineResult<()> {
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(PipelineError::EmptyMatrix);
        }

        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for col in x.axis_iter(Axis(1)) {
            let m = col.sum() / n as f64;
            let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n as f64;
            let s = var.sqrt();
            mean.push(m);
            scale.push(if s > 0.0 && s.is_finite() { s } else { 1.0 });
        }

        self.mean = mean;
        self.scale = scale;
        Ok(())
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> PipelineResult<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PipelineError::not_trained("scaler", "transform"));
        }
        if x.ncols() != self.mean.len() {
            return Err(PipelineError::WidthMismatch {
                expected: self.mean.len(),
                actual: x.ncols(),
            });
        }

        let mut out = x.to_owned();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[j], self.scale[j]);
            col.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> PipelineResult<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let mut scaler = StandardScaler::new();
        let t = scaler.fit_transform(x.view()).unwrap();
        assert_eq!(t, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_transform_requires_fit() {
        let scaler = StandardScaler::new();
        let err = scaler.transform(array![[1.0]].view()).unwrap_err();
        assert!(err.is_state_error());
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(array![[1.0, 2.0], [2.0, 3.0]].view()).unwrap();
        assert!(scaler.transform(array![[1.0]].view()).unwrap_err().is_shape_error());
    }
}
