//! Anomaly Detector
//!
//! One instance per monitored parameter. Wraps an isolation forest (primary
//! mode) and an optional recurrent sequence model (secondary mode). Both
//! modes return one boolean per feature row.

use std::path::Path;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::isolation_forest::{IsolationForest, IsolationForestParams};
use super::sequence::{SequenceModel, SequenceParams};
use super::storage::{artifact_path, load_artifact, save_artifact};
use super::{Classifier, OutlierModel};
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::layout::FEATURE_COUNT;

const OUTLIER_KIND: &str = "isolation_forest";
const SEQUENCE_KIND: &str = "sequence_model";

/// Scoring algorithm used by `detect_with`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Outlier-boundary test
    #[default]
    IsolationForest,
    /// Recurrent classifier, probability > 0.5
    Sequence,
}

impl std::str::FromStr for DetectionMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "isolation_forest" | "isolation-forest" | "iforest" => Ok(Self::IsolationForest),
            "sequence" | "lstm" | "rnn" => Ok(Self::Sequence),
            other => Err(PipelineError::InvalidParameter(format!("unknown detection method '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    params: IsolationForestParams,
    sequence_params: SequenceParams,
    outlier: Option<IsolationForest>,
    sequence: Option<SequenceModel>,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(IsolationForestParams::default())
    }
}

impl AnomalyDetector {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            sequence_params: SequenceParams::default(),
            outlier: None,
            sequence: None,
        }
    }

    pub fn with_contamination(contamination: f64, seed: u64) -> Self {
        Self::new(IsolationForestParams {
            contamination,
            seed,
            ..Default::default()
        })
    }

    pub fn with_sequence_params(mut self, params: SequenceParams) -> Self {
        self.sequence_params = params;
        self
    }

    pub fn is_trained(&self) -> bool {
        self.outlier.is_some()
    }

    pub fn has_sequence_model(&self) -> bool {
        self.sequence.is_some()
    }

    /// Feature rows the fitted sequence model looks back over
    pub fn sequence_length(&self) -> Option<usize> {
        self.sequence.as_ref().map(|m| m.params().sequence_length)
    }

    /// Decision threshold of the fitted outlier model
    pub fn threshold(&self) -> Option<f64> {
        self.outlier.as_ref().map(|m| m.threshold())
    }

    fn check_width(features: &ArrayView2<f64>) -> PipelineResult<()> {
        if features.ncols() != FEATURE_COUNT {
            return Err(PipelineError::WidthMismatch {
                expected: FEATURE_COUNT,
                actual: features.ncols(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // TRAINING
    // ========================================================================

    /// Fit the outlier model. Re-training replaces the previous fit.
    pub fn train(&mut self, features: ArrayView2<f64>) -> PipelineResult<()> {
        if features.nrows() == 0 {
            return Err(PipelineError::EmptyMatrix);
        }
        Self::check_width(&features)?;

        let mut model = IsolationForest::new(self.params);
        model.fit(features)?;
        self.outlier = Some(model);
        Ok(())
    }

    /// Fit the recurrent model against per-row labels
    pub fn train_sequence(
        &mut self,
        features: ArrayView2<f64>,
        labels: &[bool],
        epochs: usize,
    ) -> PipelineResult<()> {
        if features.nrows() == 0 {
            return Err(PipelineError::EmptyMatrix);
        }
        Self::check_width(&features)?;

        let mut model = SequenceModel::new(self.sequence_params);
        model.fit_epochs(features, labels, epochs)?;
        self.sequence = Some(model);
        Ok(())
    }

    // ========================================================================
    // DETECTION
    // ========================================================================

    pub fn detect(&self, features: ArrayView2<f64>) -> PipelineResult<Vec<bool>> {
        self.detect_with(features, DetectionMethod::IsolationForest)
    }

    pub fn detect_with(
        &self,
        features: ArrayView2<f64>,
        method: DetectionMethod,
    ) -> PipelineResult<Vec<bool>> {
        match method {
            DetectionMethod::IsolationForest => {
                let model = self
                    .outlier
                    .as_ref()
                    .ok_or_else(|| PipelineError::not_trained("anomaly detector", "detect"))?;
                Self::check_width(&features)?;
                Ok(model.predict(features))
            }
            DetectionMethod::Sequence => {
                let model = self
                    .sequence
                    .as_ref()
                    .ok_or_else(|| PipelineError::not_trained("sequence model", "detect"))?;
                Self::check_width(&features)?;
                Ok(model.predict(features))
            }
        }
    }

    /// Raw outlier scores (higher = more anomalous)
    pub fn scores(&self, features: ArrayView2<f64>) -> PipelineResult<Vec<f64>> {
        let model = self
            .outlier
            .as_ref()
            .ok_or_else(|| PipelineError::not_trained("anomaly detector", "score"))?;
        Self::check_width(&features)?;
        Ok(model.score_samples(features))
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Write `{prefix}_isolation_forest.json` and, when fitted,
    /// `{prefix}_sequence_model.json`
    pub fn persist(&self, prefix: &Path) -> PipelineResult<()> {
        let model = self
            .outlier
            .as_ref()
            .ok_or_else(|| PipelineError::not_trained("anomaly detector", "persist"))?;

        save_artifact(&artifact_path(prefix, OUTLIER_KIND), OUTLIER_KIND, model)?;
        if let Some(sequence) = &self.sequence {
            save_artifact(&artifact_path(prefix, SEQUENCE_KIND), SEQUENCE_KIND, sequence)?;
        }
        Ok(())
    }

    /// Load artifacts written by `persist`.
    ///
    /// Returns false and leaves the detector untouched when the outlier
    /// artifact is missing, corrupt or built with another feature layout.
    pub fn restore(&mut self, prefix: &Path) -> bool {
        let outlier_path = artifact_path(prefix, OUTLIER_KIND);
        let outlier: IsolationForest = match load_artifact(&outlier_path, OUTLIER_KIND) {
            Ok(model) => model,
            Err(e) => {
                log::warn!("Failed to restore detector from {}: {}", outlier_path.display(), e);
                return false;
            }
        };
        if outlier.n_features() != FEATURE_COUNT {
            log::warn!(
                "Detector artifact {} has width {}, expected {}",
                outlier_path.display(),
                outlier.n_features(),
                FEATURE_COUNT
            );
            return false;
        }

        let sequence_path = artifact_path(prefix, SEQUENCE_KIND);
        let sequence = if sequence_path.exists() {
            match load_artifact::<SequenceModel>(&sequence_path, SEQUENCE_KIND) {
                Ok(model) => Some(model),
                Err(e) => {
                    log::warn!("Ignoring sequence model {}: {}", sequence_path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        self.params = *outlier.params();
        if let Some(seq) = &sequence {
            self.sequence_params = *seq.params();
        }
        self.outlier = Some(outlier);
        self.sequence = sequence;
        true
    }
}
