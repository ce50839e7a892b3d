//! Dataset Module - Synthetic training data
//!
//! Generates labelled multi-parameter series and stores them as JSONL
//! (`CombinedRecord` per line), with a CSV export for external tools.

pub mod export;
pub mod generator;
pub mod record;
pub mod writer;


use std::path::PathBuf;

pub use generator::{
    inject_record_spike, GeneratorConfig, MaintenanceThresholds, SyntheticGenerator,
};
pub use record::{anomaly_labels, maintenance_labels, series, CombinedRecord, MaintenanceRecord};
pub use writer::{read_dataset, write_dataset, DatasetWriter};

/// Default location of the combined dataset
pub fn get_dataset_path() -> PathBuf {
    crate::logic::config::get_data_dir()
        .join("data")
        .join("combined_data.jsonl")
}
