//! Read accessors for individual metrics

use super::collector::MetricsCollector;
use super::helpers::{calculate_average, calculate_percentile, sorted};

impl MetricsCollector {
    /// Current counter value, zero when never incremented
    pub fn get_counter(&self, name: &str) -> u64 {
        self.storage.read().counters.get(name).copied().unwrap_or(0)
    }

    pub fn get_gauge(&self, name: &str) -> Option<f64> {
        self.storage.read().gauges.get(name).copied()
    }

    /// Mean of the retained samples, zero for an unknown histogram
    pub fn get_average(&self, name: &str) -> f64 {
        self.storage
            .read()
            .histograms
            .get(name)
            .map(|samples| calculate_average(samples.iter()))
            .unwrap_or(0.0)
    }

    /// Nearest-rank percentile of the retained samples, zero for an unknown histogram
    pub fn get_percentile(&self, name: &str, percentile: f64) -> f64 {
        self.storage
            .read()
            .histograms
            .get(name)
            .map(|samples| calculate_percentile(&sorted(samples), percentile))
            .unwrap_or(0.0)
    }

    /// Number of retained samples
    pub fn histogram_len(&self, name: &str) -> usize {
        self.storage
            .read()
            .histograms
            .get(name)
            .map(|samples| samples.len())
            .unwrap_or(0)
    }
}
