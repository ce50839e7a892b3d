//! Series analysis helpers
//!
//! Small offline statistics used when inspecting a dataset: energy use
//! derived from current, threshold labels and a seasonality estimate.

use std::ops::Range;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyMetrics {
    /// Sum of power samples / 1000
    pub total_energy: f64,
    pub peak_power: f64,
    pub average_power: f64,
}

/// Power (current × voltage) summary. None for an empty series.
pub fn energy_metrics(current: &[f64], voltage: f64) -> Option<EnergyMetrics> {
    if current.is_empty() {
        return None;
    }

    let power: Vec<f64> = current.iter().map(|c| c * voltage).collect();
    let sum: f64 = power.iter().sum();
    let peak = power.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(EnergyMetrics {
        total_energy: sum / 1000.0,
        peak_power: peak,
        average_power: sum / power.len() as f64,
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Flags points farther than `k` sample standard deviations from the mean
pub fn threshold_labels(values: &[f64], k: f64) -> Vec<bool> {
    if values.len() < 2 {
        return vec![false; values.len()];
    }

    let m = mean(values);
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    let limit = k * var.sqrt();

    values.iter().map(|x| (x - m).abs() > limit).collect()
}

/// Pearson correlation of the series with itself shifted by `lag`
pub fn autocorrelation(values: &[f64], lag: usize) -> Option<f64> {
    if lag >= values.len() || values.len() - lag < 2 {
        return None;
    }

    let a = &values[lag..];
    let b = &values[..values.len() - lag];
    let (ma, mb) = (mean(a), mean(b));

    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in a.iter().zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }

    let denom = (va * vb).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some(cov / denom)
}

/// Lag in `periods` with the highest autocorrelation (first one on ties)
pub fn detect_seasonality(values: &[f64], periods: Range<usize>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for lag in periods {
        if let Some(corr) = autocorrelation(values, lag) {
            if best.map_or(true, |(_, c)| corr > c) {
                best = Some((lag, corr));
            }
        }
    }

    best.map(|(lag, _)| lag)
}
