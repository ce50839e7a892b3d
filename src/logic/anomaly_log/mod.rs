//! Anomaly Log - bounded, severity-annotated record of detected anomalies
//!
//! Backed by a single JSON document (`{"metadata": .., "anomalies": [..]}`).
//! Every append is a read-modify-write of the whole document followed by an
//! atomic rename. One writer at a time; concurrent writers race and the
//! last write wins.
//!
//! Read or parse failures never propagate: a missing or corrupt file is
//! an empty log.

pub mod severity;
pub mod storage;
pub mod types;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::constants::{DEFAULT_MAX_LOG_ENTRIES, DEFAULT_RECENT_WINDOW_SECS};
use crate::logic::config::MonitorConfig;

pub use severity::{SeverityBand, SeverityThresholds};
pub use types::{AnomalyLogEntry, LogDocument, LogMetadata, LogState, LogStats, Severity};

#[derive(Debug, Clone)]
pub struct AnomalyLog {
    path: PathBuf,
    max_entries: usize,
    thresholds: SeverityThresholds,
    recent_window: Duration,
}

impl AnomalyLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_entries: DEFAULT_MAX_LOG_ENTRIES,
            thresholds: SeverityThresholds::default(),
            recent_window: Duration::seconds(DEFAULT_RECENT_WINDOW_SECS),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.anomaly_log_path.clone())
            .with_max_entries(config.max_log_entries)
            .with_thresholds(config.severity.clone())
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn with_thresholds(mut self, thresholds: SeverityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn thresholds(&self) -> &SeverityThresholds {
        &self.thresholds
    }

    fn load(&self) -> Option<LogDocument> {
        storage::read_document(&self.path)
    }

    fn save(&self, doc: &LogDocument) {
        if let Err(e) = storage::write_document(&self.path, doc) {
            log::error!("Failed to write anomaly log {}: {}", self.path.display(), e);
        }
    }

    /// Create the file (zeroed metadata) when absent or unreadable
    pub fn initialize(&self) {
        if self.load().is_none() {
            self.save(&LogDocument::empty(Utc::now()));
        }
    }

    pub fn state(&self) -> LogState {
        match self.load() {
            Some(doc) if !doc.anomalies.is_empty() => LogState::Active,
            _ => LogState::Empty,
        }
    }

    pub fn append(
        &self,
        anomaly_type: &str,
        value: f64,
        unit: &str,
        sensor_data: serde_json::Value,
    ) -> Option<AnomalyLogEntry> {
        self.append_at(Utc::now(), anomaly_type, value, unit, sensor_data)
    }

    /// Append with an explicit timestamp.
    ///
    /// Non-finite values are refused: JSON has no encoding for them and a
    /// document holding one would no longer parse.
    pub fn append_at(
        &self,
        now: DateTime<Utc>,
        anomaly_type: &str,
        value: f64,
        unit: &str,
        sensor_data: serde_json::Value,
    ) -> Option<AnomalyLogEntry> {
        if !value.is_finite() {
            log::warn!("Refusing to log non-finite {} value: {}", anomaly_type, value);
            return None;
        }

        let entry = AnomalyLogEntry {
            timestamp: now,
            anomaly_type: anomaly_type.to_string(),
            value,
            unit: unit.to_string(),
            sensor_data,
            severity: self.thresholds.classify(anomaly_type, value),
        };

        let mut doc = self.load().unwrap_or_else(|| LogDocument::empty(now));
        doc.anomalies.push(entry.clone());

        // FIFO eviction
        if doc.anomalies.len() > self.max_entries {
            let excess = doc.anomalies.len() - self.max_entries;
            doc.anomalies.drain(..excess);
        }

        doc.metadata.total_anomalies = doc.anomalies.len();
        doc.metadata.last_updated = now;
        self.save(&doc);

        log::debug!(
            "Logged {} anomaly: {} {} ({})",
            entry.anomaly_type,
            entry.value,
            entry.unit,
            entry.severity
        );
        Some(entry)
    }

    /// Newest `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<AnomalyLogEntry> {
        let Some(doc) = self.load() else {
            return Vec::new();
        };
        let start = doc.anomalies.len().saturating_sub(limit);
        doc.anomalies[start..].to_vec()
    }

    pub fn metadata(&self) -> Option<LogMetadata> {
        self.load().map(|doc| doc.metadata)
    }

    pub fn stats(&self) -> LogStats {
        self.stats_at(Utc::now())
    }

    /// Statistics with "recent" measured back from `now`
    pub fn stats_at(&self, now: DateTime<Utc>) -> LogStats {
        let Some(doc) = self.load() else {
            return LogStats::default();
        };

        let cutoff = now - self.recent_window;
        let mut stats = LogStats {
            total_anomalies: doc.anomalies.len(),
            ..Default::default()
        };

        for entry in &doc.anomalies {
            *stats.anomaly_types.entry(entry.anomaly_type.clone()).or_insert(0) += 1;
            *stats
                .severity_counts
                .entry(entry.severity.as_str().to_string())
                .or_insert(0) += 1;
            if entry.timestamp > cutoff {
                stats.recent_count += 1;
            }
        }
        stats.recent_activity = stats.recent_count > 0;
        stats
    }

    /// Reset to an empty log
    pub fn clear(&self) {
        self.save(&LogDocument::empty(Utc::now()));
        log::info!("Anomaly log cleared: {}", self.path.display());
    }
}
