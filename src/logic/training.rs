//! Training Run
//!
//! Offline pass over a combined dataset: one detector per parameter, one
//! maintenance predictor over the stacked feature blocks, and a summary
//! (`model_results.json`) of how the fitted models score on their own
//! training data.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::logic::config::MonitorConfig;
use crate::logic::dataset::{anomaly_labels, maintenance_labels, series, CombinedRecord};
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::layout::maintenance_feature_name;
use crate::logic::features::{align_labels, extract_features, stack_features};
use crate::logic::model::sequence::SequenceParams;
use crate::logic::model::{AnomalyDetector, MaintenancePredictor};
use crate::logic::sensor::Parameter;

pub const RESULTS_FILE: &str = "model_results.json";

const TOP_FEATURES: usize = 5;

/// Artifact prefix of a parameter's detector
pub fn detector_prefix(models_dir: &Path, param: Parameter) -> PathBuf {
    models_dir.join(format!("{}_anomaly", param.as_str()))
}

/// Artifact prefix of the maintenance predictor
pub fn maintenance_prefix(models_dir: &Path) -> PathBuf {
    models_dir.join("maintenance")
}

// ============================================================================
// OPTIONS / RESULTS
// ============================================================================

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub window_size: usize,
    pub contamination: f64,
    pub seed: u64,
    /// Also fit the recurrent model with this many epochs
    pub sequence_epochs: Option<usize>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            window_size: crate::constants::DEFAULT_WINDOW_SIZE,
            contamination: crate::constants::DEFAULT_CONTAMINATION,
            seed: crate::constants::DEFAULT_SEED,
            sequence_epochs: None,
        }
    }
}

impl From<&MonitorConfig> for TrainingOptions {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            window_size: config.window_size,
            contamination: config.contamination,
            seed: config.seed,
            sequence_epochs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterResult {
    /// Share of rows where the predicted flag matches the label
    pub accuracy: f64,
    /// Rows predicted anomalous
    pub anomalies: usize,
    /// Rows predicted anomalous and predicted to need maintenance
    pub maintenance: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResults {
    pub trained_at: DateTime<Utc>,
    pub window_size: usize,
    pub rows: usize,
    pub parameters: BTreeMap<Parameter, ParameterResult>,
    /// Parameters whose detector could not be trained
    #[serde(default)]
    pub skipped: BTreeMap<Parameter, String>,
    #[serde(default)]
    pub maintenance_accuracy: Option<f64>,
    /// Most important maintenance inputs, e.g. `("vibration.max", 0.12)`
    #[serde(default)]
    pub top_features: Vec<(String, f64)>,
}

impl ModelResults {
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Highest `limit` importances with their column names, descending
fn top_features(importance: &[f64], limit: usize) -> Vec<(String, f64)> {
    let mut named: Vec<(String, f64)> = importance
        .iter()
        .enumerate()
        .filter_map(|(i, v)| maintenance_feature_name(i).map(|name| (name, *v)))
        .collect();
    named.sort_by(|a, b| b.1.total_cmp(&a.1));
    named.truncate(limit);
    named
}

fn accuracy(predicted: &[bool], labels: &[bool]) -> f64 {
    if predicted.is_empty() {
        return 0.0;
    }
    let hits = predicted
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    hits as f64 / predicted.len() as f64
}

// ============================================================================
// RUN
// ============================================================================

struct TrainedParameter {
    features: Array2<f64>,
    predictions: Vec<bool>,
    accuracy: f64,
}

fn train_parameter(
    records: &[CombinedRecord],
    param: Parameter,
    models_dir: &Path,
    options: &TrainingOptions,
) -> PipelineResult<TrainedParameter> {
    let features = extract_features(&series(records, param), options.window_size)?;
    let labels = anomaly_labels(records, param);
    let labels = align_labels(&labels, options.window_size)?;

    let mut detector = AnomalyDetector::with_contamination(options.contamination, options.seed)
        .with_sequence_params(SequenceParams {
            seed: options.seed,
            ..Default::default()
        });
    detector.train(features.view())?;
    if let Some(epochs) = options.sequence_epochs {
        detector.train_sequence(features.view(), labels, epochs)?;
    }
    detector.persist(&detector_prefix(models_dir, param))?;

    let predictions = detector.detect(features.view())?;
    let accuracy = accuracy(&predictions, labels);
    Ok(TrainedParameter {
        features,
        predictions,
        accuracy,
    })
}

/// Train and persist every model, then write the results summary
pub fn run_training(
    records: &[CombinedRecord],
    models_dir: &Path,
    options: &TrainingOptions,
) -> PipelineResult<ModelResults> {
    let w = options.window_size;
    if records.len() <= w {
        return Err(PipelineError::InsufficientData {
            required: w + 1,
            actual: records.len(),
        });
    }
    fs::create_dir_all(models_dir)?;

    let mut trained: BTreeMap<Parameter, TrainedParameter> = BTreeMap::new();
    let mut skipped = BTreeMap::new();

    for param in Parameter::ALL {
        log::info!("Training {} anomaly detector...", param);
        match train_parameter(records, param, models_dir, options) {
            Ok(result) => {
                log::info!("{} accuracy: {:.4}", param, result.accuracy);
                trained.insert(param, result);
            }
            Err(e) => {
                log::error!("Error training {} model: {}", param, e);
                skipped.insert(param, e.to_string());
            }
        }
    }

    let rows = records.len() - w;

    // Maintenance needs every block in canonical order
    let mut maintenance_accuracy = None;
    let mut top = Vec::new();
    let mut maintenance_predictions: Option<Vec<bool>> = None;
    if trained.len() == Parameter::ALL.len() {
        log::info!("Training maintenance prediction model...");
        let blocks: Vec<Array2<f64>> = Parameter::ALL
            .iter()
            .filter_map(|p| trained.get(p).map(|t| t.features.clone()))
            .collect();
        let x = stack_features(&blocks)?;
        let labels = maintenance_labels(records);
        let labels = align_labels(&labels, w)?;

        let mut predictor = MaintenancePredictor::with_seed(options.seed);
        predictor.train(x.view(), labels)?;
        predictor.persist(&maintenance_prefix(models_dir))?;

        let (predicted, _) = predictor.predict(x.view())?;
        let acc = accuracy(&predicted, labels);
        log::info!("Maintenance prediction accuracy: {:.4}", acc);
        maintenance_accuracy = Some(acc);
        top = top_features(&predictor.feature_importance()?, TOP_FEATURES);
        maintenance_predictions = Some(predicted);
    } else {
        log::warn!(
            "Skipping maintenance model: {} of {} parameters trained",
            trained.len(),
            Parameter::ALL.len()
        );
    }

    let parameters = trained
        .into_iter()
        .map(|(param, t)| {
            let anomalies = t.predictions.iter().filter(|f| **f).count();
            let maintenance = maintenance_predictions
                .as_ref()
                .map(|m| {
                    t.predictions
                        .iter()
                        .zip(m)
                        .filter(|(a, m)| **a && **m)
                        .count()
                })
                .unwrap_or(0);
            (
                param,
                ParameterResult {
                    accuracy: t.accuracy,
                    anomalies,
                    maintenance,
                },
            )
        })
        .collect();

    let results = ModelResults {
        trained_at: Utc::now(),
        window_size: w,
        rows,
        parameters,
        skipped,
        maintenance_accuracy,
        top_features: top,
    };
    results.save(&models_dir.join(RESULTS_FILE))?;
    log::info!("Model results saved to {}", models_dir.join(RESULTS_FILE).display());
    Ok(results)
}
