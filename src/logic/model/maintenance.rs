//! Maintenance Predictor
//!
//! Random forest over the concatenated per-parameter feature blocks, behind
//! a standard scaler. Scaler and classifier are fitted, stored and restored
//! as one pair.

use std::path::Path;

use ndarray::ArrayView2;

use super::forest::{RandomForest, RandomForestParams};
use super::scaler::StandardScaler;
use super::storage::{artifact_path, load_artifact, save_artifact};
use super::Classifier;
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::layout::MAINTENANCE_FEATURE_COUNT;

const MODEL_KIND: &str = "model";
const SCALER_KIND: &str = "scaler";

#[derive(Debug, Clone)]
struct Fitted {
    scaler: StandardScaler,
    model: RandomForest,
}

#[derive(Debug, Clone, Default)]
pub struct MaintenancePredictor {
    params: RandomForestParams,
    fitted: Option<Fitted>,
}

impl MaintenancePredictor {
    pub fn new(params: RandomForestParams) -> Self {
        Self { params, fitted: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(RandomForestParams {
            seed,
            ..Default::default()
        })
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    fn check_width(x: &ArrayView2<f64>) -> PipelineResult<()> {
        if x.ncols() != MAINTENANCE_FEATURE_COUNT {
            return Err(PipelineError::WidthMismatch {
                expected: MAINTENANCE_FEATURE_COUNT,
                actual: x.ncols(),
            });
        }
        Ok(())
    }

    /// Fit the scaler then the classifier. Re-training overwrites prior state;
    /// a failed fit leaves the previous pair in place.
    pub fn train(&mut self, x: ArrayView2<f64>, y: &[bool]) -> PipelineResult<()> {
        if x.nrows() == 0 {
            return Err(PipelineError::EmptyMatrix);
        }
        if x.nrows() != y.len() {
            return Err(PipelineError::LengthMismatch {
                rows: x.nrows(),
                labels: y.len(),
            });
        }
        Self::check_width(&x)?;

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(x)?;

        let mut model = RandomForest::new(self.params);
        model.fit(scaled.view(), y)?;

        let positives = y.iter().filter(|v| **v).count();
        log::info!(
            "Maintenance predictor trained on {} rows ({} positive)",
            y.len(),
            positives
        );

        self.fitted = Some(Fitted { scaler, model });
        Ok(())
    }

    /// Labels and positive-class probabilities, using the fitted scaler
    pub fn predict(&self, x: ArrayView2<f64>) -> PipelineResult<(Vec<bool>, Vec<f64>)> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| PipelineError::not_trained("maintenance predictor", "predict"))?;
        Self::check_width(&x)?;

        let scaled = fitted.scaler.transform(x)?;
        let proba = fitted.model.predict_proba(scaled.view());
        let labels = proba.iter().map(|p| *p > 0.5).collect();
        Ok((labels, proba))
    }

    pub fn feature_importance(&self) -> PipelineResult<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            PipelineError::not_trained("maintenance predictor", "feature_importance")
        })?;
        Ok(fitted.model.feature_importances())
    }

    /// Write `{prefix}_model.json` and `{prefix}_scaler.json`
    pub fn persist(&self, prefix: &Path) -> PipelineResult<()> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| PipelineError::not_trained("maintenance predictor", "persist"))?;

        save_artifact(&artifact_path(prefix, MODEL_KIND), MODEL_KIND, &fitted.model)?;
        save_artifact(&artifact_path(prefix, SCALER_KIND), SCALER_KIND, &fitted.scaler)?;
        Ok(())
    }

    /// Load the model/scaler pair. Both must load and agree on width;
    /// otherwise returns false and keeps the current state.
    pub fn restore(&mut self, prefix: &Path) -> bool {
        let model_path = artifact_path(prefix, MODEL_KIND);
        let scaler_path = artifact_path(prefix, SCALER_KIND);

        let model: RandomForest = match load_artifact(&model_path, MODEL_KIND) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Failed to restore maintenance model {}: {}", model_path.display(), e);
                return false;
            }
        };
        let scaler: StandardScaler = match load_artifact(&scaler_path, SCALER_KIND) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to restore maintenance scaler {}: {}", scaler_path.display(), e);
                return false;
            }
        };

        if model.n_features() != MAINTENANCE_FEATURE_COUNT
            || scaler.n_features() != MAINTENANCE_FEATURE_COUNT
        {
            log::warn!(
                "Maintenance artifacts disagree on width (model {}, scaler {})",
                model.n_features(),
                scaler.n_features()
            );
            return false;
        }

        self.fitted = Some(Fitted { scaler, model });
        true
    }
}
