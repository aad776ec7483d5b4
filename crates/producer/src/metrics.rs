//! Producer lifecycle counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every producer started from the same handle.
///
/// `started - delivered - cancelled - shut_down` is the number of producers
/// still running, which makes detached stragglers visible.
#[derive(Debug, Default)]
pub struct ProducerMetrics {
    started: AtomicU64,
    delivered: AtomicU64,
    cancelled: AtomicU64,
    shut_down: AtomicU64,
}

impl ProducerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shut_down(&self) {
        self.shut_down.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProducerMetricsSnapshot {
        ProducerMetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            shut_down: self.shut_down.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ProducerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerMetricsSnapshot {
    pub started: u64,
    pub delivered: u64,
    pub cancelled: u64,
    pub shut_down: u64,
}

impl ProducerMetricsSnapshot {
    /// Producers that have neither delivered nor stopped yet
    pub fn running(&self) -> u64 {
        self.started
            .saturating_sub(self.delivered + self.cancelled + self.shut_down)
    }
}
