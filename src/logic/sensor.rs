//! Sensor Types
//!
//! Monitored parameters, single-parameter samples and raw multi-sensor readings.
//! No logic beyond conversions - just data structures.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::error::PipelineError;

// ============================================================================
// PARAMETER
// ============================================================================

/// A monitored physical parameter.
///
/// The declaration order is the canonical order used when per-parameter
/// feature blocks are concatenated for the maintenance model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Temperature,
    Current,
    Humidity,
    Vibration,
    Pressure,
    Viscosity,
    Power,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::Temperature,
        Parameter::Current,
        Parameter::Humidity,
        Parameter::Vibration,
        Parameter::Pressure,
        Parameter::Viscosity,
        Parameter::Power,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Current => "current",
            Parameter::Humidity => "humidity",
            Parameter::Vibration => "vibration",
            Parameter::Pressure => "pressure",
            Parameter::Viscosity => "viscosity",
            Parameter::Power => "power",
        }
    }

    /// Type name used in the anomaly log
    pub fn log_type(&self) -> &'static str {
        match self {
            Parameter::Temperature => "TEMPERATURE",
            Parameter::Current => "CURRENT",
            Parameter::Humidity => "HUMIDITY",
            Parameter::Vibration => "VIBRATION",
            Parameter::Pressure => "PRESSURE",
            Parameter::Viscosity => "VISCOSITY",
            Parameter::Power => "POWER",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Temperature => "°C",
            Parameter::Current => "A",
            Parameter::Humidity => "%",
            Parameter::Vibration => "g",
            Parameter::Pressure => "hPa",
            Parameter::Viscosity => "cP",
            Parameter::Power => "W",
        }
    }

    /// Position in the canonical order
    pub fn index(&self) -> usize {
        Parameter::ALL.iter().position(|p| p == self).unwrap_or(0)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == lower || p.log_type().eq_ignore_ascii_case(&lower))
            .ok_or_else(|| PipelineError::InvalidParameter(s.to_string()))
    }
}

// ============================================================================
// SAMPLES
// ============================================================================

/// One reading of one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub timestamp: DateTime<Utc>,
    pub parameter: Parameter,
    pub value: f64,
}

/// Order samples by timestamp (stable, duplicates kept) and return the values
pub fn series_from_samples(samples: &[SensorSample]) -> Vec<f64> {
    let mut ordered: Vec<&SensorSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);
    ordered.into_iter().map(|s| s.value).collect()
}

// ============================================================================
// RAW READINGS (sensor file / receiver)
// ============================================================================

/// A multi-sensor record as written by the serial bridge or served by the receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    pub voltage: f64,
    pub current: f64,

    /// Parameters flagged upstream (e.g. "TEMPERATURE")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ml_anomalies: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SensorReading {
    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }

    /// Values of the parameters this reading carries
    pub fn parameter_values(&self) -> BTreeMap<Parameter, f64> {
        BTreeMap::from([
            (Parameter::Temperature, self.temperature),
            (Parameter::Humidity, self.humidity),
            (Parameter::Current, self.current),
            (Parameter::Power, self.power()),
        ])
    }

    /// Snapshot stored next to anomaly log entries
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "temperature": self.temperature,
            "humidity": self.humidity,
            "voltage": self.voltage,
            "current": self.current,
            "power": self.power(),
            "timestamp": self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parameter_round_trip_names() {
        for p in Parameter::ALL {
            assert_eq!(p.as_str().parse::<Parameter>().unwrap(), p);
            assert_eq!(p.log_type().parse::<Parameter>().unwrap(), p);
        }
        assert!("pressure_x".parse::<Parameter>().is_err());
    }

    #[test]
    fn test_canonical_index() {
        assert_eq!(Parameter::Temperature.index(), 0);
        assert_eq!(Parameter::Power.index(), 6);
    }

    #[test]
    fn test_series_from_samples_sorts_and_keeps_duplicates() {
        let t = |s: i64| Utc.timestamp_opt(s, 0).unwrap();
        let samples = vec![
            SensorSample { timestamp: t(30), parameter: Parameter::Temperature, value: 3.0 },
            SensorSample { timestamp: t(10), parameter: Parameter::Temperature, value: 1.0 },
            SensorSample { timestamp: t(10), parameter: Parameter::Temperature, value: 1.5 },
        ];
        assert_eq!(series_from_samples(&samples), vec![1.0, 1.5, 3.0]);
    }

    #[test]
    fn test_reading_power() {
        let r = SensorReading {
            temperature: 25.0,
            humidity: 60.0,
            voltage: 220.0,
            current: 5.0,
            ml_anomalies: vec![],
            timestamp: None,
        };
        assert_eq!(r.power(), 1100.0);
        assert_eq!(r.parameter_values()[&Parameter::Power], 1100.0);
    }
}
