// Fixed-capacity metric history for the live charts.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    pub value: f64,
    pub captured_at: DateTime<Utc>,
}

/// Append-only buffer; the oldest sample is evicted once `capacity` is exceeded.
/// Values are stored as given (NaN and negatives included).
#[derive(Debug, Clone)]
pub struct BoundedSeries {
    capacity: usize,
    samples: VecDeque<MetricSample>,
}

impl Default for BoundedSeries {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BoundedSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.push_at(value, Utc::now());
    }

    pub fn push_at(&mut self, value: f64, captured_at: DateTime<Utc>) {
        self.samples.push_back(MetricSample { value, captured_at });
        self.evict();
    }

    /// Lowering the capacity drops the excess oldest samples immediately.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Values oldest first.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn samples(&self) -> &VecDeque<MetricSample> {
        &self.samples
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    fn evict(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }
}

/// The three dashboard charts, resized together from `Settings::chart_points`.
#[derive(Debug, Clone, Default)]
pub struct ChartSet {
    pub cpu: BoundedSeries,
    pub memory: BoundedSeries,
    pub network: BoundedSeries,
}

impl ChartSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cpu: BoundedSeries::new(capacity),
            memory: BoundedSeries::new(capacity),
            network: BoundedSeries::new(capacity),
        }
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.cpu.set_capacity(capacity);
        self.memory.set_capacity(capacity);
        self.network.set_capacity(capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_capacity_values_in_push_order() {
        let mut series = BoundedSeries::new(5);
        for i in 0..12 {
            series.push(i as f64);
            assert!(series.len() <= 5);
        }
        let values: Vec<f64> = series.values().collect();
        assert_eq!(values, vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn lowering_capacity_truncates_from_front() {
        let mut series = BoundedSeries::new(10);
        for i in 0..10 {
            series.push(i as f64);
        }
        series.set_capacity(3);
        let values: Vec<f64> = series.values().collect();
        assert_eq!(values, vec![7.0, 8.0, 9.0]);

        series.set_capacity(6);
        series.push(10.0);
        assert_eq!(series.len(), 4);
    }

    #[test]
    fn passes_through_out_of_range_values() {
        let mut series = BoundedSeries::new(3);
        series.push(-1.0);
        series.push(f64::NAN);
        let values: Vec<f64> = series.values().collect();
        assert_eq!(values[0], -1.0);
        assert!(values[1].is_nan());
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut series = BoundedSeries::new(0);
        series.push(1.0);
        assert!(series.is_empty());
        assert!(series.latest().is_none());
    }

    #[test]
    fn chart_set_resizes_every_series() {
        let mut charts = ChartSet::with_capacity(4);
        for i in 0..4 {
            charts.cpu.push(i as f64);
            charts.memory.push(i as f64);
            charts.network.push(i as f64);
        }
        charts.set_capacity(2);
        assert_eq!(charts.cpu.len(), 2);
        assert_eq!(charts.memory.len(), 2);
        assert_eq!(charts.network.values().collect::<Vec<_>>(), vec![2.0, 3.0]);
    }
}
