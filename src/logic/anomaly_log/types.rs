use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyLogEntry {
    pub timestamp: DateTime<Utc>,
    pub anomaly_type: String,
    pub value: f64,
    pub unit: String,
    /// Full sensor reading at detection time
    pub sensor_data: serde_json::Value,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMetadata {
    pub created: DateTime<Utc>,
    pub total_anomalies: usize,
    pub last_updated: DateTime<Utc>,
}

/// On-disk layout of the anomaly log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogDocument {
    pub metadata: LogMetadata,
    pub anomalies: Vec<AnomalyLogEntry>,
}

impl LogDocument {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            metadata: LogMetadata {
                created: now,
                total_anomalies: 0,
                last_updated: now,
            },
            anomalies: Vec::new(),
        }
    }
}

/// Empty until the first append; `clear` returns to Empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogState {
    Empty,
    Active,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    pub total_anomalies: usize,
    pub anomaly_types: BTreeMap<String, usize>,
    pub severity_counts: BTreeMap<String, usize>,
    /// At least one entry inside the recent window
    pub recent_activity: bool,
    pub recent_count: usize,
}
