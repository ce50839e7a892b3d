//! Inference Pipeline
//!
//! Restores whatever trained artifacts exist and scores live windows.
//! Each parameter is handled on its own: a missing model or a short
//! window only affects that parameter's entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::Serialize;

use crate::logic::config::MonitorConfig;
use crate::logic::dataset::MaintenanceRecord;
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::features::{live_feature_rows, live_features, stack_features, FeatureVector};
use crate::logic::model::{AnomalyDetector, DetectionMethod, MaintenancePredictor};
use crate::logic::sensor::Parameter;
use crate::logic::training::{detector_prefix, maintenance_prefix};

/// Outcome of one assessment pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct Assessment {
    pub timestamp: DateTime<Utc>,
    /// Parameters that were scored, with their flag
    pub flags: BTreeMap<Parameter, bool>,
    /// Parameters that could not be scored
    pub errors: BTreeMap<Parameter, String>,
    pub maintenance: Option<MaintenanceRecord>,
}

impl Assessment {
    pub fn flagged(&self) -> Vec<Parameter> {
        self.flags
            .iter()
            .filter(|(_, flag)| **flag)
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn any_flagged(&self) -> bool {
        self.flags.values().any(|f| *f)
    }
}

#[derive(Debug, Clone)]
pub struct MonitoringPipeline {
    window_size: usize,
    method: DetectionMethod,
    models_dir: PathBuf,
    detectors: BTreeMap<Parameter, AnomalyDetector>,
    predictor: Option<MaintenancePredictor>,
}

impl MonitoringPipeline {
    /// Empty pipeline; every parameter reports "not trained"
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            method: DetectionMethod::default(),
            models_dir: PathBuf::new(),
            detectors: BTreeMap::new(),
            predictor: None,
        }
    }

    /// Restore detectors and predictor from `models_dir`
    pub fn load(models_dir: &Path, config: &MonitorConfig) -> Self {
        let mut pipeline = Self::new(config.window_size);
        pipeline.models_dir = models_dir.to_path_buf();

        for param in Parameter::ALL {
            let mut detector = AnomalyDetector::default();
            if detector.restore(&detector_prefix(models_dir, param)) {
                log::info!("Loaded {} anomaly detection model", param);
                pipeline = pipeline.with_detector(param, detector);
            } else {
                log::warn!("{} anomaly detection model not available", param);
            }
        }

        let mut predictor = MaintenancePredictor::default();
        if predictor.restore(&maintenance_prefix(models_dir)) {
            log::info!("Loaded maintenance prediction model");
            pipeline = pipeline.with_predictor(predictor);
        } else {
            log::warn!("Maintenance prediction model not available");
        }

        pipeline
    }

    pub fn with_detector(mut self, param: Parameter, detector: AnomalyDetector) -> Self {
        self.detectors.insert(param, detector);
        self
    }

    pub fn with_predictor(mut self, predictor: MaintenancePredictor) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn with_method(mut self, method: DetectionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn loaded_detectors(&self) -> Vec<Parameter> {
        self.detectors.keys().copied().collect()
    }

    pub fn detector(&self, param: Parameter) -> Option<&AnomalyDetector> {
        self.detectors.get(&param)
    }

    pub fn has_predictor(&self) -> bool {
        self.predictor.is_some()
    }

    /// Flag for the newest window. The sequence model is fed the trailing
    /// windows of `values`; the outlier model only needs `latest`.
    fn detect_one(
        &self,
        param: Parameter,
        values: &[f64],
        latest: &FeatureVector,
    ) -> PipelineResult<bool> {
        let detector = self
            .detectors
            .get(&param)
            .ok_or_else(|| PipelineError::not_trained("anomaly detector", "assess"))?;
        latest.validate()?;

        let rows = match (self.method, detector.sequence_length()) {
            (DetectionMethod::Sequence, Some(len)) => {
                live_feature_rows(values, self.window_size, len)?
            }
            _ => latest.to_row(),
        };
        let flags = detector.detect_with(rows.view(), self.method)?;
        Ok(flags.last().copied().unwrap_or(false))
    }

    fn predict_maintenance(
        &self,
        now: DateTime<Utc>,
        features: &BTreeMap<Parameter, FeatureVector>,
    ) -> PipelineResult<Option<MaintenanceRecord>> {
        let predictor = match &self.predictor {
            Some(p) => p,
            None => return Ok(None),
        };
        if features.len() != Parameter::ALL.len() {
            return Ok(None);
        }

        let blocks: Vec<Array2<f64>> = Parameter::ALL
            .iter()
            .filter_map(|p| features.get(p).map(|f| f.to_row()))
            .collect();
        let x = stack_features(&blocks)?;
        let (labels, proba) = predictor.predict(x.view())?;

        Ok(Some(MaintenanceRecord {
            timestamp: now,
            maintenance_needed: labels.first().copied().unwrap_or(false),
            probability: proba.first().copied().unwrap_or(0.0),
        }))
    }

    pub fn assess(&self, windows: &BTreeMap<Parameter, Vec<f64>>) -> Assessment {
        self.assess_at(Utc::now(), windows)
    }

    /// Score the latest window of every supplied parameter
    pub fn assess_at(
        &self,
        now: DateTime<Utc>,
        windows: &BTreeMap<Parameter, Vec<f64>>,
    ) -> Assessment {
        let mut assessment = Assessment {
            timestamp: now,
            ..Default::default()
        };
        let mut features = BTreeMap::new();

        for (param, values) in windows {
            let vector = match live_features(values, self.window_size) {
                Ok(v) => v,
                Err(e) => {
                    assessment.errors.insert(*param, e.to_string());
                    continue;
                }
            };
            log::trace!("{} features: {:?}", param, vector.named());

            match self.detect_one(*param, values, &vector) {
                Ok(flag) => {
                    assessment.flags.insert(*param, flag);
                }
                Err(e) => {
                    if !e.is_state_error() {
                        log::warn!("{} assessment failed: {}", param, e);
                    }
                    assessment.errors.insert(*param, e.to_string());
                }
            }
            features.insert(*param, vector);
        }

        match self.predict_maintenance(now, &features) {
            Ok(record) => assessment.maintenance = record,
            Err(e) => log::warn!("Maintenance prediction failed: {}", e),
        }

        if !assessment.errors.is_empty() {
            log::debug!("Assessment errors: {:?}", assessment.errors);
        }
        assessment
    }
}
