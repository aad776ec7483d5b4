//! Dispatcher counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by a dispatcher and its racer tasks
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    aggregations: AtomicU64,
    timed_out: AtomicU64,
    races_won: AtomicU64,
    races_lost: AtomicU64,
    late_results: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_aggregations(&self) {
        self.aggregations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_races_won(&self) {
        self.races_won.fetch_add(1, Ordering::Relaxed);
    }

    /// A race ended without any replica answering
    pub fn inc_races_lost(&self) {
        self.races_lost.fetch_add(1, Ordering::Relaxed);
    }

    /// A category answered after its aggregation stopped listening
    pub fn inc_late_results(&self) {
        self.late_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            aggregations: self.aggregations.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            races_won: self.races_won.load(Ordering::Relaxed),
            races_lost: self.races_lost.load(Ordering::Relaxed),
            late_results: self.late_results.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatcherMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub aggregations: u64,
    pub timed_out: u64,
    pub races_won: u64,
    pub races_lost: u64,
    pub late_results: u64,
}
