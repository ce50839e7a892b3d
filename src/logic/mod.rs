//! Logic Module - Monitoring & Prediction Engines
//!
//! ## Layout
//! - `sensor` - parameter catalogue and raw readings
//! - `features/` - windowed statistical features
//! - `model/` - anomaly detectors and the maintenance predictor
//! - `anomaly_log/` - bounded, severity-annotated anomaly record
//! - `dataset/` - synthetic labelled data
//! - `training`, `pipeline`, `monitor/` - offline training, live inference, polling loop

// Core modules
pub mod config;
pub mod error;
pub mod sensor;

// Engines
pub mod anomaly_log;
pub mod dataset;
pub mod features;
pub mod model;

// Orchestration
pub mod analysis;
pub mod monitor;
pub mod pipeline;
pub mod training;
