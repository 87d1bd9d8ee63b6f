//! Hit/miss accounting.
//!
//! Counters are plain atomics so lookups can record them without touching the
//! primary lock. Only caller-facing lookups count; the re-check a fill leader
//! performs before invoking the fill function does not.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free hit/miss counters.
#[derive(Debug, Default)]
pub struct Stats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn lookup_count(&self) -> u64 {
        self.hit_count() + self.miss_count()
    }

    /// Hits over lookups, `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.lookup_count();
        if lookups == 0 {
            return 0.0;
        }
        self.hit_count() as f64 / lookups as f64
    }
}

/// Point-in-time view of a cache's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_without_lookups() {
        let stats = Stats::new();
        assert_eq!(stats.lookup_count(), 0);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_count(), 3);
        assert_eq!(stats.miss_count(), 1);
        assert_eq!(stats.lookup_count(), 4);
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
