//! Metrics collection and aggregation
//!
//! Counters, gauges and bounded histograms with nearest-rank percentiles.

mod bounded;
mod collector;
mod getters;
mod helpers;
mod types;


pub(crate) use bounded::{BoundedPush, tail};
pub use collector::MetricsCollector;
pub use types::{HistogramSummary, MetricsSummary};
