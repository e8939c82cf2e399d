//! Cache Statistics Module
//!
//! Item counts for a store and hit/revalidation counters for the fetcher.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Store Stats ==
/// Snapshot of a store's items by freshness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of items in the store
    pub total_items: usize,
    /// Items whose expiry has passed
    pub expired_items: usize,
    /// Items without an expiry
    pub persistent_items: usize,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one item.
    pub fn record(&mut self, has_expiry: bool, expired: bool) {
        self.total_items += 1;
        if !has_expiry {
            self.persistent_items += 1;
        }
        if expired {
            self.expired_items += 1;
        }
    }

    /// Items that can still be served without revalidation.
    pub fn fresh_items(&self) -> usize {
        self.total_items - self.expired_items
    }
}

// == Fetch Stats ==
/// Snapshot of how fetches were answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    /// Served from a fresh cache item without touching the network
    pub hits: u64,
    /// No cached item; fetched from the server
    pub misses: u64,
    /// Stale item confirmed by a not-modified response
    pub revalidated: u64,
    /// Stale item replaced by a new response
    pub refetched: u64,
    /// Fetches that ended in an error
    pub failures: u64,
}

impl FetchStats {
    // == Hit Rate ==
    /// Share of fetches answered without downloading a body.
    ///
    /// Returns (hits + revalidated) / all successful fetches, or 0.0 if none
    /// have completed.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.revalidated + self.refetched;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.revalidated) as f64 / total as f64
        }
    }
}

// == Fetch Counters ==
/// Lock-free counters shared by concurrent fetches.
#[derive(Debug, Default)]
pub struct FetchCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    revalidated: AtomicU64,
    refetched: AtomicU64,
    failures: AtomicU64,
}

impl FetchCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_revalidated(&self) {
        self.revalidated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refetched(&self) {
        self.refetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStats {
        FetchStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            revalidated: self.revalidated.load(Ordering::Relaxed),
            refetched: self.refetched.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_stats_new() {
        let stats = StoreStats::new();
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.expired_items, 0);
        assert_eq!(stats.persistent_items, 0);
    }

    #[test]
    fn test_store_stats_record() {
        let mut stats = StoreStats::new();
        stats.record(true, true);
        stats.record(true, false);
        stats.record(false, false);

        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.expired_items, 1);
        assert_eq!(stats.persistent_items, 1);
        assert_eq!(stats.fresh_items(), 2);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = FetchStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let counters = FetchCounters::new();
        counters.record_hit();
        counters.record_revalidated();
        counters.record_miss();
        counters.record_refetched();
        counters.record_failure();

        let stats = counters.snapshot();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_counters_across_threads() {
        let counters = std::sync::Arc::new(FetchCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        counters.record_hit();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.snapshot().hits, 400);
    }
}
