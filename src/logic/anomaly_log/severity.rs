//! Severity bands per anomaly type
//!
//! Pure function of (type, value). Upper bounds are inclusive (>=), lower
//! bounds inclusive (<=). Types without a band are MEDIUM.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBand {
    pub critical_high: f64,
    pub critical_low: f64,
    pub high_high: f64,
    pub high_low: f64,
}

impl SeverityBand {
    pub const fn new(critical_high: f64, critical_low: f64, high_high: f64, high_low: f64) -> Self {
        Self {
            critical_high,
            critical_low,
            high_high,
            high_low,
        }
    }

    pub fn classify(&self, value: f64) -> Severity {
        if value >= self.critical_high || value <= self.critical_low {
            Severity::Critical
        } else if value >= self.high_high || value <= self.high_low {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

/// Bands keyed by uppercase anomaly type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    bands: BTreeMap<String, SeverityBand>,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self::empty()
            .with_band("TEMPERATURE", SeverityBand::new(60.0, -5.0, 45.0, 5.0))
            .with_band("HUMIDITY", SeverityBand::new(98.0, 2.0, 90.0, 10.0))
            .with_band("CURRENT", SeverityBand::new(20.0, 0.1, 12.0, 1.0))
            .with_band("POWER", SeverityBand::new(3000.0, 100.0, 2000.0, 500.0))
    }
}

impl SeverityThresholds {
    /// No bands: everything is MEDIUM
    pub fn empty() -> Self {
        Self {
            bands: BTreeMap::new(),
        }
    }

    pub fn with_band(mut self, anomaly_type: &str, band: SeverityBand) -> Self {
        self.bands.insert(anomaly_type.to_uppercase(), band);
        self
    }

    pub fn band(&self, anomaly_type: &str) -> Option<&SeverityBand> {
        self.bands.get(&anomaly_type.to_uppercase())
    }

    pub fn classify(&self, anomaly_type: &str, value: f64) -> Severity {
        self.band(anomaly_type)
            .map(|b| b.classify(value))
            .unwrap_or(Severity::Medium)
    }
}
