//! Mock search backend
//!
//! Fake replicas for tests and for running without real backends.
//! Answers `"<name> result for \"<query>\""` after a simulated delay.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::{DelayProfile, Query, ReplicaConfig, SearchBackend, SearchResult};
use rand::Rng;
use tracing::{debug, trace};

/// Mock replica with configurable latency
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    delay: DelayProfile,
    released: AtomicU64,
}

impl MockBackend {
    pub fn new(name: impl Into<String>, delay: DelayProfile) -> Self {
        Self {
            name: name.into(),
            delay,
            released: AtomicU64::new(0),
        }
    }

    /// Always answers after `ms` milliseconds
    pub fn fixed(name: impl Into<String>, ms: u64) -> Self {
        Self::new(name, DelayProfile::Fixed { ms })
    }

    /// Answers after a random delay in `[min_ms, max_ms]`
    pub fn uniform(name: impl Into<String>, min_ms: u64, max_ms: u64) -> Self {
        Self::new(name, DelayProfile::Uniform { min_ms, max_ms })
    }

    /// Never answers
    pub fn never(name: impl Into<String>) -> Self {
        Self::new(name, DelayProfile::Never)
    }

    /// Build from a replica configuration entry
    pub fn from_config(config: &ReplicaConfig) -> Self {
        Self::new(config.name.clone(), config.delay)
    }

    pub fn delay(&self) -> DelayProfile {
        self.delay
    }

    /// How many times the cleanup hook ran
    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Draw the next latency; `None` means "never answer"
    fn sample_delay(&self) -> Option<Duration> {
        match self.delay {
            DelayProfile::Fixed { ms } => Some(Duration::from_millis(ms)),
            DelayProfile::Uniform { min_ms, max_ms } => {
                let (lo, hi) = (min_ms.min(max_ms), min_ms.max(max_ms));
                let ms = rand::rng().random_range(lo..=hi);
                Some(Duration::from_millis(ms))
            }
            DelayProfile::Never => None,
        }
    }
}

impl SearchBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &Query) -> SearchResult {
        match self.sample_delay() {
            Some(delay) => {
                trace!(replica = %self.name, delay_ms = delay.as_millis() as u64, "mock search");
                tokio::time::sleep(delay).await;
            }
            None => std::future::pending::<()>().await,
        }
        SearchResult::new(format!("{} result for {:?}", self.name, query.as_str()))
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
        debug!(replica = %self.name, "mock backend released");
    }
}
