//! Producer - runs one replica against one query
//!
//! Every start spawns a fresh task; producers are never reused across queries.

use std::sync::Arc;

use contracts::{Query, SearchBackend, SearchResult};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::metrics::ProducerMetrics;

/// A replica wrapped as a startable producer.
///
/// Cloning is cheap: clones share the backend and the metrics.
pub struct Producer<B> {
    pub(crate) backend: Arc<B>,
    pub(crate) metrics: Arc<ProducerMetrics>,
}

impl<B> Clone for Producer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<B: SearchBackend + Sync + 'static> Producer<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Wrap an already shared backend
    pub fn from_arc(backend: Arc<B>) -> Self {
        Self {
            backend,
            metrics: Arc::new(ProducerMetrics::new()),
        }
    }

    /// Share lifecycle counters with other producers
    pub fn with_metrics(mut self, metrics: Arc<ProducerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replica name
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn metrics(&self) -> &Arc<ProducerMetrics> {
        &self.metrics
    }

    /// Start answering `query` in the background.
    ///
    /// The returned receiver yields exactly one result. The task is not
    /// tracked: if the receiver is dropped the work still runs to completion.
    pub fn start(&self, query: Query) -> oneshot::Receiver<SearchResult> {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        metrics.record_started();

        tokio::spawn(async move {
            let result = backend.search(&query).await;
            metrics.record_delivered();
            if tx.send(result).is_err() {
                trace!(replica = backend.name(), "result reader gone");
            }
        });

        rx
    }

    /// Like [`start`](Self::start), but abandons the work once `cancel` fires.
    ///
    /// A cancelled producer never delivers; its receiver resolves with an error.
    pub fn start_with_cancel(
        &self,
        query: Query,
        cancel: CancellationToken,
    ) -> oneshot::Receiver<SearchResult> {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        metrics.record_started();

        tokio::spawn(async move {
            tokio::select! {
                result = backend.search(&query) => {
                    metrics.record_delivered();
                    if tx.send(result).is_err() {
                        trace!(replica = backend.name(), "result reader gone");
                    }
                }
                _ = cancel.cancelled() => {
                    metrics.record_cancelled();
                    debug!(replica = backend.name(), query = %query, "producer cancelled");
                }
            }
        });

        rx
    }
}
