//! Bounded collection utilities

use std::collections::VecDeque;

/// Helper trait for bounded VecDeque operations
pub(crate) trait BoundedPush<T> {
    fn push_bounded(&mut self, value: T, max_size: usize);
}

impl<T> BoundedPush<T> for VecDeque<T> {
    /// Push a value while maintaining a maximum size (O(1) amortized)
    #[inline]
    fn push_bounded(&mut self, value: T, max_size: usize) {
        if max_size == 0 {
            return;
        }
        while self.len() >= max_size {
            self.pop_front();
        }
        self.push_back(value);
    }
}

/// The last `n` items of `values`, oldest first
pub(crate) fn tail<T: Clone>(values: &VecDeque<T>, n: usize) -> Vec<T> {
    let skip = values.len().saturating_sub(n);
    values.iter().skip(skip).cloned().collect()
}
