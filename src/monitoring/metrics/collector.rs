//! Metrics collector implementation for recording metrics

use super::bounded::BoundedPush;
use super::helpers::{calculate_average, calculate_percentile, sorted};
use super::types::{HistogramSummary, MetricsStorage, MetricsSummary};
use crate::config::MetricsConfig;
use parking_lot::RwLock;
use std::future::Future;
use std::time::Instant;

/// Counters, gauges and bounded histograms keyed by name
///
/// Histograms keep only the most recent `histogram_capacity` samples, so
/// averages and percentiles describe that window rather than all time.
#[derive(Debug)]
pub struct MetricsCollector {
    pub(super) storage: RwLock<MetricsStorage>,
    pub(super) histogram_capacity: usize,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default().histogram_capacity)
    }
}

impl MetricsCollector {
    /// Create a collector retaining `histogram_capacity` samples per histogram
    pub fn new(histogram_capacity: usize) -> Self {
        Self {
            storage: RwLock::new(MetricsStorage::default()),
            histogram_capacity: histogram_capacity.max(1),
        }
    }

    pub fn from_config(config: &MetricsConfig) -> Self {
        Self::new(config.histogram_capacity)
    }

    /// Add `by` to a counter
    pub fn increment(&self, name: &str, by: u64) {
        let mut storage = self.storage.write();
        match storage.counters.get_mut(name) {
            Some(value) => *value = value.saturating_add(by),
            None => {
                storage.counters.insert(name.to_string(), by);
            }
        }
    }

    /// Set a gauge, replacing the previous value
    pub fn gauge(&self, name: &str, value: f64) {
        self.storage.write().gauges.insert(name.to_string(), value);
    }

    /// Record a histogram sample, evicting the oldest beyond capacity
    pub fn timing(&self, name: &str, value: f64) {
        let capacity = self.histogram_capacity;
        let mut storage = self.storage.write();
        match storage.histograms.get_mut(name) {
            Some(samples) => samples.push_bounded(value, capacity),
            None => {
                let mut samples = std::collections::VecDeque::with_capacity(capacity.min(64));
                samples.push_bounded(value, capacity);
                storage.histograms.insert(name.to_string(), samples);
            }
        }
    }

    /// Await `future` and record its duration in milliseconds under `name`
    pub async fn time<F, T>(&self, name: &str, future: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = Instant::now();
        let output = future.await;
        self.timing(name, start.elapsed().as_secs_f64() * 1000.0);
        output
    }

    /// Snapshot of every counter, gauge and histogram aggregate
    pub fn summary(&self) -> MetricsSummary {
        let storage = self.storage.read();

        let histograms = storage
            .histograms
            .iter()
            .map(|(name, samples)| {
                let values = sorted(samples);
                let summary = HistogramSummary {
                    count: values.len(),
                    avg: calculate_average(values.iter()),
                    p50: calculate_percentile(&values, 50.0),
                    p95: calculate_percentile(&values, 95.0),
                    p99: calculate_percentile(&values, 99.0),
                };
                (name.clone(), summary)
            })
            .collect();

        MetricsSummary {
            counters: storage
                .counters
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            gauges: storage
                .gauges
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            histograms,
        }
    }

    /// Clear counters, gauges and histograms
    pub fn reset(&self) {
        let mut storage = self.storage.write();
        storage.counters.clear();
        storage.gauges.clear();
        storage.histograms.clear();
    }
}
