//! Metric storage and summary types

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// All metrics behind one lock
#[derive(Debug, Default)]
pub(super) struct MetricsStorage {
    pub(super) counters: HashMap<String, u64>,
    pub(super) gauges: HashMap<String, f64>,
    /// Most recent samples per histogram, oldest first
    pub(super) histograms: HashMap<String, VecDeque<f64>>,
}

/// Aggregates of one histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramSummary {
    pub count: usize,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Snapshot of every metric
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, HistogramSummary>,
}
