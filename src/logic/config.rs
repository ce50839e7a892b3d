//! Runtime configuration
//!
//! Built from `constants` defaults and environment overrides, then
//! optionally adjusted by command-line flags.

use std::path::PathBuf;

use crate::constants;
use crate::logic::anomaly_log::SeverityThresholds;
use crate::logic::dataset::{get_dataset_path, MaintenanceThresholds};

/// Base directory for all runtime files
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ENMOS_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("enmos")
}

/// Monitor / pipeline configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sliding window length (feature extraction)
    pub window_size: usize,

    /// Outlier share assumed in detector training data
    pub contamination: f64,

    /// Seed for every learning component
    pub seed: u64,

    /// Anomaly log capacity
    pub max_log_entries: usize,

    /// Severity bands per anomaly type
    pub severity: SeverityThresholds,

    /// Labelling rules for synthetic maintenance data
    pub maintenance: MaintenanceThresholds,

    pub models_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub anomaly_log_path: PathBuf,
    pub sensor_file_path: PathBuf,

    pub receiver_url: String,
    pub receiver_enabled: bool,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub fetch_limit: usize,

    pub history_capacity: usize,
    pub cache_capacity: usize,
    pub voltage: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let base = PathBuf::from(".");
        Self {
            window_size: constants::DEFAULT_WINDOW_SIZE,
            contamination: constants::DEFAULT_CONTAMINATION,
            seed: constants::DEFAULT_SEED,
            max_log_entries: constants::DEFAULT_MAX_LOG_ENTRIES,
            severity: SeverityThresholds::default(),
            maintenance: MaintenanceThresholds::default(),
            models_dir: base.join("models"),
            dataset_path: base.join("data").join("combined_data.jsonl"),
            anomaly_log_path: base.join("anomaly_log.json"),
            sensor_file_path: base.join("latest_sensor_data.json"),
            receiver_url: constants::DEFAULT_RECEIVER_URL.to_string(),
            receiver_enabled: true,
            poll_interval_secs: constants::DEFAULT_POLL_INTERVAL,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT,
            fetch_limit: constants::DEFAULT_FETCH_LIMIT,
            history_capacity: constants::DEFAULT_HISTORY_CAPACITY,
            cache_capacity: constants::DEFAULT_CACHE_CAPACITY,
            voltage: constants::DEFAULT_VOLTAGE,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let base = get_data_dir();

        Self {
            window_size: constants::get_window_size(),
            contamination: constants::get_contamination(),
            seed: constants::get_seed(),
            max_log_entries: constants::get_max_log_entries(),
            models_dir: env_path("ENMOS_MODELS_DIR").unwrap_or_else(|| base.join("models")),
            dataset_path: env_path("ENMOS_DATASET").unwrap_or_else(get_dataset_path),
            anomaly_log_path: env_path("ENMOS_ANOMALY_LOG")
                .unwrap_or_else(|| base.join("anomaly_log.json")),
            sensor_file_path: env_path("ENMOS_SENSOR_FILE")
                .unwrap_or_else(|| base.join("latest_sensor_data.json")),
            receiver_url: constants::get_receiver_url(),
            receiver_enabled: constants::is_receiver_enabled(),
            poll_interval_secs: constants::get_poll_interval(),
            request_timeout_secs: constants::get_request_timeout(),
            ..Default::default()
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}
