use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::sensor::{series_from_samples, Parameter, SensorSample};

/// One generated timestep: every parameter, its ground-truth anomaly flag
/// and the maintenance label
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CombinedRecord {
    pub timestamp: DateTime<Utc>,

    pub temperature: f64,
    pub is_anomaly_temp: bool,
    pub current: f64,
    pub is_anomaly_current: bool,
    pub humidity: f64,
    pub is_anomaly_humidity: bool,
    pub vibration: f64,
    pub is_anomaly_vibration: bool,
    pub pressure: f64,
    pub is_anomaly_pressure: bool,
    pub viscosity: f64,
    pub is_anomaly_viscosity: bool,
    pub power: f64,
    pub is_anomaly_power: bool,

    pub maintenance_needed: bool,
    pub maintenance_probability: f64,
}

impl CombinedRecord {
    pub fn value(&self, param: Parameter) -> f64 {
        match param {
            Parameter::Temperature => self.temperature,
            Parameter::Current => self.current,
            Parameter::Humidity => self.humidity,
            Parameter::Vibration => self.vibration,
            Parameter::Pressure => self.pressure,
            Parameter::Viscosity => self.viscosity,
            Parameter::Power => self.power,
        }
    }

    pub fn set_value(&mut self, param: Parameter, value: f64) {
        match param {
            Parameter::Temperature => self.temperature = value,
            Parameter::Current => self.current = value,
            Parameter::Humidity => self.humidity = value,
            Parameter::Vibration => self.vibration = value,
            Parameter::Pressure => self.pressure = value,
            Parameter::Viscosity => self.viscosity = value,
            Parameter::Power => self.power = value,
        }
    }

    pub fn is_anomaly(&self, param: Parameter) -> bool {
        match param {
            Parameter::Temperature => self.is_anomaly_temp,
            Parameter::Current => self.is_anomaly_current,
            Parameter::Humidity => self.is_anomaly_humidity,
            Parameter::Vibration => self.is_anomaly_vibration,
            Parameter::Pressure => self.is_anomaly_pressure,
            Parameter::Viscosity => self.is_anomaly_viscosity,
            Parameter::Power => self.is_anomaly_power,
        }
    }

    pub fn set_anomaly(&mut self, param: Parameter, flag: bool) {
        match param {
            Parameter::Temperature => self.is_anomaly_temp = flag,
            Parameter::Current => self.is_anomaly_current = flag,
            Parameter::Humidity => self.is_anomaly_humidity = flag,
            Parameter::Vibration => self.is_anomaly_vibration = flag,
            Parameter::Pressure => self.is_anomaly_pressure = flag,
            Parameter::Viscosity => self.is_anomaly_viscosity = flag,
            Parameter::Power => self.is_anomaly_power = flag,
        }
    }

    /// Number of parameters flagged at this timestep
    pub fn anomaly_count(&self) -> usize {
        Parameter::ALL.iter().filter(|p| self.is_anomaly(**p)).count()
    }

    pub fn any_anomaly(&self) -> bool {
        self.anomaly_count() > 0
    }

    pub fn sample(&self, param: Parameter) -> SensorSample {
        SensorSample {
            timestamp: self.timestamp,
            parameter: param,
            value: self.value(param),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MaintenanceRecord {
    pub timestamp: DateTime<Utc>,
    pub maintenance_needed: bool,
    /// In [0, 1]
    pub probability: f64,
}

// Series and labels share one ordering: timestamp, stable on ties.

fn by_time(records: &[CombinedRecord]) -> Vec<&CombinedRecord> {
    let mut ordered: Vec<&CombinedRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);
    ordered
}

/// Values of one parameter in timestamp order
pub fn series(records: &[CombinedRecord], param: Parameter) -> Vec<f64> {
    let samples: Vec<SensorSample> = records.iter().map(|r| r.sample(param)).collect();
    series_from_samples(&samples)
}

/// Ground-truth anomaly flags of one parameter, aligned with `series`
pub fn anomaly_labels(records: &[CombinedRecord], param: Parameter) -> Vec<bool> {
    by_time(records).into_iter().map(|r| r.is_anomaly(param)).collect()
}

pub fn maintenance_labels(records: &[CombinedRecord]) -> Vec<bool> {
    by_time(records).into_iter().map(|r| r.maintenance_needed).collect()
}
