//! Engine status report (`enmos status`)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::logic::anomaly_log::{AnomalyLog, LogState};
use crate::logic::config::MonitorConfig;
use crate::logic::features::{layout_hash, FEATURE_COUNT, FEATURE_VERSION, MAINTENANCE_FEATURE_COUNT};
use crate::logic::pipeline::MonitoringPipeline;
use crate::logic::training::{ModelResults, RESULTS_FILE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub app_version: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_count: usize,
    pub maintenance_feature_count: usize,
    pub window_size: usize,

    pub model: ModelStatus,
    pub dataset: DatasetStatus,
    pub anomaly_log: LogStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub models_dir: String,
    /// Parameters with a restorable detector
    pub detectors: Vec<String>,
    /// Subset that also carries a sequence model
    pub sequence_models: Vec<String>,
    pub maintenance_loaded: bool,
    pub maintenance_accuracy: Option<f64>,
    pub trained_on_rows: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStatus {
    pub path: String,
    pub exists: bool,
    pub size_mb: f64,
    pub total_records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogStatus {
    pub path: String,
    pub state: LogState,
    pub total_anomalies: usize,
    pub recent_activity: bool,
}

fn dataset_status(path: &Path) -> DatasetStatus {
    let (exists, size_mb, total_records) = match fs::metadata(path) {
        Ok(meta) => {
            let records = fs::read_to_string(path)
                .map(|c| c.lines().filter(|l| !l.trim().is_empty()).count())
                .unwrap_or(0);
            (true, meta.len() as f64 / (1024.0 * 1024.0), records)
        }
        Err(_) => (false, 0.0, 0),
    };

    DatasetStatus {
        path: path.display().to_string(),
        exists,
        size_mb,
        total_records,
    }
}

/// Collect the status of every on-disk component
pub fn collect(config: &MonitorConfig) -> EngineStatus {
    let pipeline = MonitoringPipeline::load(&config.models_dir, config);
    let detectors = pipeline.loaded_detectors();
    let sequence_models = detectors
        .iter()
        .filter(|p| pipeline.detector(**p).map_or(false, |d| d.has_sequence_model()))
        .map(|p| p.to_string())
        .collect();
    let results = ModelResults::load(&config.models_dir.join(RESULTS_FILE)).ok();

    let log = AnomalyLog::from_config(config);
    let stats = log.stats();

    EngineStatus {
        app_version: crate::constants::APP_VERSION.to_string(),
        feature_version: FEATURE_VERSION,
        layout_hash: layout_hash(),
        feature_count: FEATURE_COUNT,
        maintenance_feature_count: MAINTENANCE_FEATURE_COUNT,
        window_size: config.window_size,
        model: ModelStatus {
            models_dir: config.models_dir.display().to_string(),
            detectors: detectors.iter().map(|p| p.to_string()).collect(),
            sequence_models,
            maintenance_loaded: pipeline.has_predictor(),
            maintenance_accuracy: results.as_ref().and_then(|r| r.maintenance_accuracy),
            trained_on_rows: results.as_ref().map(|r| r.rows),
        },
        dataset: dataset_status(&config.dataset_path),
        anomaly_log: LogStatus {
            path: log.path().display().to_string(),
            state: log.state(),
            total_anomalies: stats.total_anomalies,
            recent_activity: stats.recent_activity,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_status_of_empty_workspace() {
        let dir = tempdir().unwrap();
        let config = MonitorConfig {
            models_dir: dir.path().join("models"),
            dataset_path: dir.path().join("data.jsonl"),
            anomaly_log_path: dir.path().join("log.json"),
            ..Default::default()
        };

        let status = collect(&config);
        assert_eq!(status.feature_count, 7);
        assert_eq!(status.maintenance_feature_count, 49);
        assert!(status.model.detectors.is_empty());
        assert!(!status.model.maintenance_loaded);
        assert!(!status.dataset.exists);
        assert_eq!(status.anomaly_log.state, LogState::Empty);
    }
}
