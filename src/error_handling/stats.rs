//! Atomic counters over provider-failure classes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::IntoEnumIterator;

use super::types::ErrorType;

/// Process-wide failure counters, keyed by [`ErrorType`].
///
/// Updated by the fetch executor on every failed attempt; read by the health
/// endpoint and the shutdown summary log.
#[derive(Debug)]
pub struct ProcessingStats {
    counters: HashMap<ErrorType, AtomicUsize>,
}

impl ProcessingStats {
    /// Creates zeroed counters for every failure class.
    pub fn new() -> Self {
        Self {
            counters: ErrorType::iter()
                .map(|error_type| (error_type, AtomicUsize::new(0)))
                .collect(),
        }
    }

    /// Increments the counter for `error_type`.
    pub fn increment(&self, error_type: ErrorType) {
        if let Some(counter) = self.counters.get(&error_type) {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Current count for `error_type`.
    pub fn count(&self, error_type: ErrorType) -> usize {
        self.counters
            .get(&error_type)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Sum across all failure classes.
    pub fn total(&self) -> usize {
        self.counters
            .values()
            .map(|c| c.load(Ordering::SeqCst))
            .sum()
    }

    /// Non-zero counters as `(class, count)` pairs for logging.
    pub fn snapshot(&self) -> Vec<(ErrorType, usize)> {
        ErrorType::iter()
            .map(|error_type| (error_type, self.count(error_type)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let stats = ProcessingStats::new();
        for error_type in ErrorType::iter() {
            assert_eq!(stats.count(error_type), 0);
        }
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_increment_and_total() {
        let stats = ProcessingStats::new();
        stats.increment(ErrorType::Timeout);
        stats.increment(ErrorType::Timeout);
        stats.increment(ErrorType::KeyRejected);
        assert_eq!(stats.count(ErrorType::Timeout), 2);
        assert_eq!(stats.count(ErrorType::KeyRejected), 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_snapshot_skips_zeroes() {
        let stats = ProcessingStats::new();
        stats.increment(ErrorType::Parse);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot, vec![(ErrorType::Parse, 1)]);
    }
}
