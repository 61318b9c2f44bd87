//! Helper functions for metrics calculations

/// Nearest-rank percentile of ascending `sorted_values`, `percentile` in 0..=100
pub(super) fn calculate_percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let n = sorted_values.len();
    let rank = (percentile / 100.0 * n as f64).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    sorted_values[index]
}

/// Sorted copy of `values`
pub(super) fn sorted<'a>(values: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.into_iter().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Calculate average of f64 values from any iterable
pub(super) fn calculate_average<'a>(values: impl ExactSizeIterator<Item = &'a f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        0.0
    } else {
        values.sum::<f64>() / len as f64
    }
}
