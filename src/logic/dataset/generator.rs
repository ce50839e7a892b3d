//! Synthetic Data Generator
//!
//! Minute-resolution multi-sensor series with a daily sinusoid, weekend
//! offsets and Gaussian noise. At most one parameter is anomalous per
//! timestep. Maintenance labels are drawn from a threshold rule.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::record::CombinedRecord;
use crate::logic::error::{PipelineError, PipelineResult};
use crate::logic::sensor::Parameter;

// ============================================================================
// MAINTENANCE RULE
// ============================================================================

/// Upper limits above which maintenance is needed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceThresholds {
    pub temperature: f64,
    pub current: f64,
    pub humidity: f64,
    pub vibration: f64,
    pub pressure: f64,
    pub viscosity: f64,
    pub power: f64,
    /// Label probability when maintenance is needed
    pub needed_probability: f64,
    /// Label probability otherwise
    pub idle_probability: f64,
}

impl Default for MaintenanceThresholds {
    fn default() -> Self {
        Self {
            temperature: 35.0,
            current: 8.0,
            humidity: 90.0,
            vibration: 1.5,
            pressure: 140.0,
            viscosity: 85.0,
            power: 2500.0,
            needed_probability: 0.95,
            idle_probability: 0.001,
        }
    }
}

impl MaintenanceThresholds {
    pub fn limit(&self, param: Parameter) -> f64 {
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

    /// Any limit exceeded (strictly) or any anomaly flagged
    pub fn needs_maintenance(&self, record: &CombinedRecord) -> bool {
        Parameter::ALL
            .iter()
            .any(|p| record.value(*p) > self.limit(*p))
            || record.any_anomaly()
    }

    pub fn probability(&self, needed: bool) -> f64 {
        if needed {
            self.needed_probability
        } else {
            self.idle_probability
        }
    }
}

// ============================================================================
// GENERATOR
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub start: DateTime<Utc>,
    /// Number of one-minute steps
    pub points: usize,
    /// Per-timestep anomaly probability
    pub anomaly_probability: f64,
    pub voltage: f64,
    pub seed: u64,
    pub maintenance: MaintenanceThresholds,
}

impl GeneratorConfig {
    /// `days` of minute data ending now
    pub fn for_days(days: u32) -> Self {
        let now = Utc::now();
        let now = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);
        Self {
            start: now - Duration::days(days as i64),
            points: days as usize * 24 * 60,
            ..Default::default()
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start: DateTime::<Utc>::default(),
            points: 30 * 24 * 60,
            anomaly_probability: 0.0005,
            voltage: crate::constants::DEFAULT_VOLTAGE,
            seed: crate::constants::DEFAULT_SEED,
            maintenance: MaintenanceThresholds::default(),
        }
    }
}

pub struct SyntheticGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

/// Standard normal draw (Box-Muller)
pub(crate) fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Unit-rate exponential draw (inverse CDF)
fn exponential<R: Rng>(rng: &mut R) -> f64 {
    -(1.0 - rng.gen::<f64>()).ln()
}

/// Zero-mean Gaussian draw
fn gauss(rng: &mut StdRng, std: f64) -> f64 {
    std * standard_normal(rng)
}

impl SyntheticGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate(&mut self) -> Vec<CombinedRecord> {
        let n = self.config.points;
        let mut records = Vec::with_capacity(n);

        for i in 0..n {
            let timestamp = self.config.start + Duration::minutes(i as i64);
            records.push(self.step(timestamp));
        }

        let anomalies = records.iter().filter(|r| r.any_anomaly()).count();
        let maintenance = records.iter().filter(|r| r.maintenance_needed).count();
        log::info!(
            "Generated {} records ({} anomalies, {} maintenance labels)",
            records.len(),
            anomalies,
            maintenance
        );
        records
    }

    fn step(&mut self, timestamp: DateTime<Utc>) -> CombinedRecord {
        let rng = &mut self.rng;

        let hours = timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0;
        let daily = (2.0 * PI * hours / 24.0).sin();
        let weekend = timestamp.weekday().num_days_from_monday() >= 5;
        let (temp_offset, current_offset, humidity_offset) =
            if weekend { (-2.0, -1.0, 5.0) } else { (0.0, 0.0, 0.0) };

        // One anomaly at most, on a uniformly chosen parameter
        let anomalous = rng.gen_bool(self.config.anomaly_probability.clamp(0.0, 1.0));
        let target = Parameter::ALL[rng.gen_range(0..Parameter::ALL.len())];
        let hit = |p: Parameter| anomalous && target == p;

        let spike = |p: Parameter, std: f64, rng: &mut StdRng| -> f64 {
            if hit(p) {
                gauss(rng, std)
            } else {
                0.0
            }
        };

        let temperature = 25.0 + 5.0 * daily
            + temp_offset
            + gauss(rng, 0.5)
            + spike(Parameter::Temperature, 3.0, rng);

        let current = (5.0 + 2.0 * daily
            + current_offset
            + gauss(rng, 0.2)
            + spike(Parameter::Current, 2.0, rng))
        .max(0.0);

        let humidity = (60.0 + 10.0 * daily
            + humidity_offset
            + gauss(rng, 2.0)
            + spike(Parameter::Humidity, 15.0, rng))
        .clamp(0.0, 100.0);

        let vibration_spike = if hit(Parameter::Vibration) {
            exponential(rng)
        } else {
            0.0
        };
        let vibration = (0.5 + 0.2 * daily + gauss(rng, 0.1) + vibration_spike).max(0.0);

        let pressure = (100.0 + 10.0 * daily
            + gauss(rng, 2.0)
            + spike(Parameter::Pressure, 20.0, rng))
        .clamp(50.0, 150.0);

        let viscosity = (50.0 + 5.0 * daily
            + gauss(rng, 1.0)
            + spike(Parameter::Viscosity, 10.0, rng))
        .clamp(20.0, 100.0);

        let power = (current * self.config.voltage
            + gauss(rng, 100.0)
            + spike(Parameter::Power, 500.0, rng))
        .max(0.0);

        let mut record = CombinedRecord {
            timestamp,
            temperature,
            is_anomaly_temp: hit(Parameter::Temperature),
            current,
            is_anomaly_current: hit(Parameter::Current),
            humidity,
            is_anomaly_humidity: hit(Parameter::Humidity),
            vibration,
            is_anomaly_vibration: hit(Parameter::Vibration),
            pressure,
            is_anomaly_pressure: hit(Parameter::Pressure),
            viscosity,
            is_anomaly_viscosity: hit(Parameter::Viscosity),
            power,
            is_anomaly_power: hit(Parameter::Power),
            maintenance_needed: false,
            maintenance_probability: 0.0,
        };

        let needed = self.config.maintenance.needs_maintenance(&record);
        let probability = self.config.maintenance.probability(needed);
        record.maintenance_probability = probability;
        record.maintenance_needed = rng.gen_bool(probability.clamp(0.0, 1.0));
        record
    }
}

/// Overwrite one value of a series (scenario construction)
#[cfg(test)]
pub fn inject_spike(values: &mut [f64], index: usize, value: f64) -> PipelineResult<()> {
    let len = values.len();
    let slot = values.get_mut(index).ok_or(PipelineError::InsufficientData {
        required: index + 1,
        actual: len,
    })?;
    *slot = value;
    Ok(())
}

/// Overwrite one parameter of one record and mark it anomalous
pub fn inject_record_spike(
    records: &mut [CombinedRecord],
    index: usize,
    param: Parameter,
    value: f64,
) -> PipelineResult<()> {
    let len = records.len();
    let record = records.get_mut(index).ok_or(PipelineError::InsufficientData {
        required: index + 1,
        actual: len,
    })?;
    record.set_value(param, value);
    record.set_anomaly(param, true);
    Ok(())
}
