//! Sensor file reader
//!
//! The serial bridge rewrites a small JSON object after every sample.
//! A reading is accepted only when the four numeric keys are present;
//! anything else is logged and skipped.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::logic::sensor::SensorReading;

pub const REQUIRED_KEYS: [&str; 4] = ["temperature", "humidity", "voltage", "current"];

/// RFC 3339, or a naive ISO timestamp taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Build a reading from a decoded JSON object. `now` fills a missing timestamp.
pub fn parse_reading(value: &Value, now: DateTime<Utc>) -> Option<SensorReading> {
    let obj = value.as_object()?;

    let mut numbers = [0.0; 4];
    for (slot, key) in numbers.iter_mut().zip(REQUIRED_KEYS) {
        match obj.get(key).and_then(Value::as_f64) {
            Some(v) if v.is_finite() => *slot = v,
            _ => {
                log::warn!("Sensor data missing numeric '{}'", key);
                return None;
            }
        }
    }

    // Each factor can be finite while the product overflows
    if !(numbers[2] * numbers[3]).is_finite() {
        log::warn!("Sensor data power out of range: {} V x {} A", numbers[2], numbers[3]);
        return None;
    }

    let ml_anomalies = obj
        .get("ml_anomalies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let timestamp = obj
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(now);

    Some(SensorReading {
        temperature: numbers[0],
        humidity: numbers[1],
        voltage: numbers[2],
        current: numbers[3],
        ml_anomalies,
        timestamp: Some(timestamp),
    })
}

/// Latest reading from the sensor file, or None when absent or invalid
pub fn read_sensor_file(path: &Path) -> Option<SensorReading> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("Sensor data file {} not readable: {}", path.display(), e);
            return None;
        }
    };

    let value: Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("JSON decode error reading {}: {}", path.display(), e);
            return None;
        }
    };

    parse_reading(&value, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_valid_file_gets_timestamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latest.json");
        fs::write(
            &path,
            r#"{"temperature": 24.5, "humidity": 55, "voltage": 220.0, "current": 1.2}"#,
        )
        .unwrap();

        let reading = read_sensor_file(&path).unwrap();
        assert_eq!(reading.temperature, 24.5);
        assert_eq!(reading.humidity, 55.0);
        assert!(reading.timestamp.is_some());
        assert!(reading.ml_anomalies.is_empty());
    }

    #[test]
    fn test_existing_timestamp_kept() {
        let value = serde_json::json!({
            "temperature": 30.0,
            "humidity": 40.0,
            "voltage": 230.0,
            "current": 2.0,
            "timestamp": "2024-05-01T12:30:00",
            "ml_anomalies": ["TEMPERATURE"],
        });
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let reading = parse_reading(&value, now).unwrap();

        assert_eq!(
            reading.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap())
        );
        assert_eq!(reading.ml_anomalies, vec!["TEMPERATURE".to_string()]);
    }

    #[test]
    fn test_invalid_inputs_are_none() {
        let dir = tempdir().unwrap();
        assert!(read_sensor_file(&dir.path().join("missing.json")).is_none());

        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        assert!(read_sensor_file(&path).is_none());

        fs::write(&path, r#"{"temperature": 20, "humidity": 50, "voltage": 220}"#).unwrap();
        assert!(read_sensor_file(&path).is_none());

        fs::write(
            &path,
            r#"{"temperature": "hot", "humidity": 50, "voltage": 220, "current": 1}"#,
        )
        .unwrap();
        assert!(read_sensor_file(&path).is_none());

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(read_sensor_file(&path).is_none());
    }

    #[test]
    fn test_overflowing_power_is_rejected() {
        let value = serde_json::json!({
            "temperature": 20.0,
            "humidity": 50.0,
            "voltage": 1e200,
            "current": 1e200,
            "ml_anomalies": ["POWER"],
        });
        assert!(parse_reading(&value, Utc::now()).is_none());
    }
}
