//! Bounded live state
//!
//! Fixed-capacity ring buffers: the per-parameter value history fed to the
//! inference pipeline, and the cache of records fetched from the receiver.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::logic::sensor::{Parameter, SensorReading};

/// Per-parameter rolling value history
#[derive(Debug, Clone)]
pub struct SensorHistory {
    capacity: usize,
    values: BTreeMap<Parameter, VecDeque<f64>>,
    times: VecDeque<DateTime<Utc>>,
}

impl SensorHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            values: BTreeMap::new(),
            times: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, param: Parameter, value: f64) {
        let capacity = self.capacity;
        let buffer = self
            .values
            .entry(param)
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if buffer.len() == capacity {
            buffer.pop_front();
        }
        buffer.push_back(value);
    }

    /// Record every parameter a reading carries
    pub fn push_reading(&mut self, reading: &SensorReading, at: DateTime<Utc>) {
        for (param, value) in reading.parameter_values() {
            self.push(param, value);
        }
        if self.times.len() == self.capacity {
            self.times.pop_front();
        }
        self.times.push_back(reading.timestamp.unwrap_or(at));
    }

    pub fn len(&self, param: Parameter) -> usize {
        self.values.get(&param).map_or(0, |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(|b| b.is_empty())
    }

    /// Values of one parameter, oldest first
    pub fn values(&self, param: Parameter) -> Vec<f64> {
        self.values
            .get(&param)
            .map(|b| b.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every non-empty buffer, ready for `MonitoringPipeline::assess`
    pub fn windows(&self) -> BTreeMap<Parameter, Vec<f64>> {
        self.values
            .iter()
            .filter(|(_, b)| !b.is_empty())
            .map(|(p, b)| (*p, b.iter().copied().collect()))
            .collect()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.times.back().copied()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.times.clear();
    }
}

/// Ring buffer of the most recent receiver records
#[derive(Debug, Clone)]
pub struct RecordCache<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T: Clone> RecordCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::new(),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.push(item);
        }
    }

    /// Swap in a fresh snapshot, keeping at most `capacity` of its newest items
    pub fn replace(&mut self, items: impl IntoIterator<Item = T>) {
        self.items.clear();
        self.extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Newest `limit` items, oldest first
    pub fn latest(&self, limit: usize) -> Vec<T> {
        let skip = self.items.len().saturating_sub(limit);
        self.items.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(t: f64) -> SensorReading {
        SensorReading {
            temperature: t,
            humidity: 50.0,
            voltage: 220.0,
            current: 2.0,
            ml_anomalies: Vec::new(),
            timestamp: None,
        }
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = SensorHistory::new(3);
        for v in 0..5 {
            history.push(Parameter::Vibration, v as f64);
        }
        assert_eq!(history.len(Parameter::Vibration), 3);
        assert_eq!(history.values(Parameter::Vibration), vec![2.0, 3.0, 4.0]);
        assert!(history.values(Parameter::Pressure).is_empty());
    }

    #[test]
    fn test_history_from_readings() {
        let mut history = SensorHistory::new(100);
        assert!(history.is_empty());
        let now = Utc::now();
        history.push_reading(&reading(21.0), now);
        history.push_reading(&reading(22.0), now);

        let windows = history.windows();
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[&Parameter::Temperature], vec![21.0, 22.0]);
        assert_eq!(windows[&Parameter::Power], vec![440.0, 440.0]);
        assert_eq!(history.last_update(), Some(now));

        history.clear();
        assert!(history.is_empty());
        assert!(history.last_update().is_none());
    }

    #[test]
    fn test_record_cache_ring() {
        let mut cache = RecordCache::new(4);
        cache.extend(0..10);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.latest(2), vec![8, 9]);
        assert_eq!(cache.latest(100), vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_record_cache_replace_does_not_accumulate() {
        let mut cache = RecordCache::new(1000);
        for _ in 0..3 {
            cache.replace(vec![1, 2, 3]);
        }
        assert_eq!(cache.latest(100), vec![1, 2, 3]);

        let mut small = RecordCache::new(2);
        small.replace(vec![1, 2, 3]);
        assert_eq!(small.latest(100), vec![2, 3]);
    }
}
