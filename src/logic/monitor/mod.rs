//! Live Monitor
//!
//! Polls the sensor file and the receiver on a fixed interval, keeps a
//! bounded history per parameter, scores it with the inference pipeline
//! and records flagged parameters in the anomaly log.
//!
//! Each tick is independent: a missing file or an unreachable receiver
//! degrades that tick only, and the next tick simply tries again.

pub mod history;
pub mod reader;
pub mod receiver;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use crate::logic::anomaly_log::{AnomalyLog, AnomalyLogEntry};
use crate::logic::config::MonitorConfig;
use crate::logic::pipeline::{Assessment, MonitoringPipeline};
use crate::logic::sensor::{Parameter, SensorReading};

pub use history::{RecordCache, SensorHistory};
pub use reader::{parse_reading, read_sensor_file};
pub use receiver::{ConnectionState, ReceiverClient, ReceiverError, ReceiverStatus};

// ============================================================================
// STATE
// ============================================================================

/// Shared live state, read by status views while the loop writes it
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub history: SensorHistory,
    pub cache: RecordCache<Value>,
    pub receiver: ReceiverStatus,
    pub last_reading: Option<SensorReading>,
    pub last_assessment: Option<Assessment>,
    pub ticks: u64,
    pub logged_anomalies: u64,
    pub started_at: DateTime<Utc>,
}

impl MonitorState {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            history: SensorHistory::new(config.history_capacity),
            cache: RecordCache::new(config.cache_capacity),
            receiver: ReceiverStatus::disconnected(),
            last_reading: None,
            last_assessment: None,
            ticks: 0,
            logged_anomalies: 0,
            started_at: Utc::now(),
        }
    }
}

/// What one tick did
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub reading: bool,
    pub flagged: Vec<Parameter>,
    pub logged: Vec<AnomalyLogEntry>,
    pub fetched: usize,
}

/// Parameters named in upstream `ml_anomalies` strings
fn upstream_flags(reading: &SensorReading) -> BTreeSet<Parameter> {
    Parameter::ALL
        .iter()
        .filter(|p| {
            reading
                .ml_anomalies
                .iter()
                .any(|a| a.to_uppercase().contains(p.log_type()))
        })
        .copied()
        .collect()
}

// ============================================================================
// MONITOR
// ============================================================================

pub struct LiveMonitor {
    config: MonitorConfig,
    pipeline: MonitoringPipeline,
    log: AnomalyLog,
    receiver: Option<ReceiverClient>,
    state: Arc<RwLock<MonitorState>>,
}

impl LiveMonitor {
    pub fn new(config: MonitorConfig, pipeline: MonitoringPipeline, log: AnomalyLog) -> Self {
        let receiver = if config.receiver_enabled {
            match ReceiverClient::new(&config.receiver_url, config.request_timeout_secs) {
                Ok(client) => Some(client),
                Err(e) => {
                    log::warn!("Receiver client unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let state = Arc::new(RwLock::new(MonitorState::new(&config)));
        Self {
            config,
            pipeline,
            log,
            receiver,
            state,
        }
    }

    /// Load models and open the log named by `config`
    pub fn from_config(config: MonitorConfig) -> Self {
        let pipeline = MonitoringPipeline::load(&config.models_dir, &config);
        let log = AnomalyLog::from_config(&config);
        Self::new(config, pipeline, log)
    }

    pub fn state(&self) -> Arc<RwLock<MonitorState>> {
        Arc::clone(&self.state)
    }

    pub fn pipeline(&self) -> &MonitoringPipeline {
        &self.pipeline
    }

    /// Ingest one reading: history, assessment, log entries
    pub fn process_reading(&self, reading: &SensorReading, now: DateTime<Utc>) -> TickReport {
        let windows = {
            let mut state = self.state.write();
            state.history.push_reading(reading, now);
            state.last_reading = Some(reading.clone());
            state.history.windows()
        };

        let assessment = self.pipeline.assess_at(now, &windows);

        let mut flagged: BTreeSet<Parameter> = if assessment.any_flagged() {
            assessment.flagged().into_iter().collect()
        } else {
            BTreeSet::new()
        };
        flagged.extend(upstream_flags(reading));

        let values = reading.parameter_values();
        let snapshot = reading.snapshot();
        let mut logged = Vec::new();
        for param in &flagged {
            let value = match values.get(param) {
                Some(v) => *v,
                None => continue,
            };
            if let Some(entry) =
                self.log
                    .append_at(now, param.log_type(), value, param.unit(), snapshot.clone())
            {
                logged.push(entry);
            }
        }

        if !logged.is_empty() {
            log::warn!(
                "Anomalies detected: {}",
                logged
                    .iter()
                    .map(|e| format!("{} {:.2}{} ({})", e.anomaly_type, e.value, e.unit, e.severity))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        if let Some(record) = &assessment.maintenance {
            if record.maintenance_needed {
                log::warn!("Maintenance predicted (p = {:.3})", record.probability);
            }
        }

        {
            let mut state = self.state.write();
            state.logged_anomalies += logged.len() as u64;
            state.last_assessment = Some(assessment);
        }

        TickReport {
            reading: true,
            flagged: flagged.into_iter().collect(),
            logged,
            fetched: 0,
        }
    }

    /// Each fetch is the receiver's newest records and supersedes the last
    fn store_fetched(&self, records: Vec<Value>) -> usize {
        let count = records.len();
        let mut state = self.state.write();
        state.cache.replace(records);
        if let Some(latest) = state.cache.latest(1).first() {
            log::debug!("Latest receiver record: {}", latest);
        }
        count
    }

    async fn poll_receiver(&self) -> usize {
        let client = match &self.receiver {
            Some(c) => c,
            None => return 0,
        };

        let status = client.status().await;
        let fetched = if status.is_connected() {
            match client.fetch_data(self.config.fetch_limit).await {
                Ok(records) => self.store_fetched(records),
                Err(e) => {
                    log::debug!("Receiver data fetch failed: {}", e);
                    0
                }
            }
        } else {
            0
        };

        log::debug!("{}", status.summary());
        self.state.write().receiver = status;
        fetched
    }

    /// One poll: sensor file, assessment, receiver
    pub async fn tick(&self) -> TickReport {
        let now = Utc::now();
        let mut report = match read_sensor_file(&self.config.sensor_file_path) {
            Some(reading) => self.process_reading(&reading, now),
            None => TickReport::default(),
        };
        report.fetched = self.poll_receiver().await;

        self.state.write().ticks += 1;
        report
    }

    /// Run until `max_ticks` (forever when None)
    pub async fn run(&self, max_ticks: Option<u64>) {
        log::info!("Starting live monitor...");
        log::info!("  Sensor file: {}", self.config.sensor_file_path.display());
        log::info!("  Anomaly log: {}", self.log.path().display());
        if let Some(client) = &self.receiver {
            log::info!("  Receiver: {}", client.base_url());
        }
        log::info!("  Poll interval: {}s", self.config.poll_interval_secs);
        log::info!(
            "  Detectors loaded: {}/{}",
            self.pipeline.loaded_detectors().len(),
            Parameter::ALL.len()
        );

        self.log.initialize();

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        let mut done = 0u64;

        loop {
            interval.tick().await;
            let report = self.tick().await;
            if !report.flagged.is_empty() {
                log::info!("Tick flagged: {:?}", report.flagged);
            }

            done += 1;
            if max_ticks.map_or(false, |max| done >= max) {
                break;
            }
        }

        log::info!("Live monitor stopped after {} ticks", done);
    }
}
