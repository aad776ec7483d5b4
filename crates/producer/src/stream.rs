//! Streaming producer - a long-lived replica emitting successive results
//!
//! Keeps answering the same query until told to stop. Both the computation
//! and every delivery race against the shutdown request, so once the
//! request is observed nothing more is sent.

use std::sync::Arc;
use std::time::Duration;

use contracts::{Query, SearchBackend, SearchResult};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace};

use crate::metrics::ProducerMetrics;
use crate::producer::Producer;
use crate::shutdown::{ProducerState, ShutdownListener, ShutdownRequest};

/// One element of a result stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamItem {
    /// 1-based sequence number
    pub seq: u64,
    pub result: SearchResult,
}

/// Long-lived producer built on top of a replica
pub struct StreamingProducer<B> {
    producer: Producer<B>,
    capacity: usize,
}

impl<B: SearchBackend + Sync + 'static> StreamingProducer<B> {
    /// `capacity` bounds how far the producer may run ahead of its reader
    pub fn new(producer: Producer<B>, capacity: usize) -> Self {
        Self {
            producer,
            capacity: capacity.max(1),
        }
    }

    /// Start streaming results for `query` until `listener` sees a request
    /// or the reader goes away.
    #[instrument(name = "stream_start", skip(self, listener), fields(replica = %self.producer.name()))]
    pub fn start(&self, query: Query, listener: ShutdownListener) -> StreamHandle {
        let (tx, rx) = mpsc::channel(self.capacity);
        let (state_tx, state_rx) = watch::channel(ProducerState::Running);
        let backend = Arc::clone(&self.producer.backend);
        let metrics = Arc::clone(&self.producer.metrics);
        metrics.record_started();

        let join = tokio::spawn(async move {
            run_stream(backend, metrics, query, tx, listener, state_tx).await;
        });

        StreamHandle {
            items: rx,
            state: state_rx,
            join,
        }
    }
}

async fn run_stream<B: SearchBackend + Sync>(
    backend: Arc<B>,
    metrics: Arc<ProducerMetrics>,
    query: Query,
    tx: mpsc::Sender<StreamItem>,
    mut listener: ShutdownListener,
    state_tx: watch::Sender<ProducerState>,
) {
    let name = backend.name().to_string();
    let mut seq: u64 = 0;
    debug!(replica = %name, query = %query, "stream started");

    loop {
        let result = tokio::select! {
            result = backend.search(&query) => result,
            request = listener.requested() => {
                return shut_down(&*backend, &metrics, request, &state_tx);
            }
        };

        seq += 1;
        let item = StreamItem { seq, result };

        tokio::select! {
            sent = tx.send(item) => {
                if sent.is_err() {
                    debug!(replica = %name, seq, "stream reader gone");
                    break;
                }
                trace!(replica = %name, seq, "stream item sent");
            }
            request = listener.requested() => {
                return shut_down(&*backend, &metrics, request, &state_tx);
            }
        }
    }

    if let Some(request) = listener.close() {
        request.acknowledge(&name, "already finished");
    }
    metrics.record_delivered();
    state_tx.send_replace(ProducerState::Terminated);
}

fn shut_down<B: SearchBackend>(
    backend: &B,
    metrics: &ProducerMetrics,
    request: ShutdownRequest,
    state_tx: &watch::Sender<ProducerState>,
) {
    state_tx.send_replace(ProducerState::CleaningUp);
    debug!(replica = backend.name(), reason = request.reason(), "stream shutting down");

    backend.release();
    metrics.record_shut_down();

    request.acknowledge(backend.name(), "see you");
    state_tx.send_replace(ProducerState::Terminated);
}

/// Reader side of a streaming producer
#[derive(Debug)]
pub struct StreamHandle {
    items: mpsc::Receiver<StreamItem>,
    state: watch::Receiver<ProducerState>,
    join: JoinHandle<()>,
}

impl StreamHandle {
    /// Next item, or `None` once the producer left `Running`.
    ///
    /// Items still buffered when a shutdown is observed are discarded, so
    /// nothing is handed out after the request was acknowledged.
    pub async fn next(&mut self) -> Option<StreamItem> {
        if self.shutting_down() {
            self.discard_buffered();
            return None;
        }

        let item = self.items.recv().await;
        if self.shutting_down() {
            self.discard_buffered();
            return None;
        }
        item
    }

    fn shutting_down(&self) -> bool {
        *self.state.borrow() != ProducerState::Running
    }

    fn discard_buffered(&mut self) {
        self.items.close();
        let mut discarded = 0usize;
        while self.items.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "dropped items buffered before shutdown");
        }
    }

    /// Read items until the gap between two of them exceeds `idle`, the
    /// stream ends or shuts down, or `max` items were collected.
    pub async fn collect_until_idle(&mut self, idle: Duration, max: usize) -> Vec<StreamItem> {
        let mut collected = Vec::new();

        while collected.len() < max {
            match tokio::time::timeout(idle, self.next()).await {
                Ok(Some(item)) => collected.push(item),
                Ok(None) => break,
                Err(_) => {
                    info!(
                        idle_ms = idle.as_millis() as u64,
                        collected = collected.len(),
                        "stream too slow, giving up"
                    );
                    break;
                }
            }
        }

        collected
    }

    pub fn state(&self) -> ProducerState {
        *self.state.borrow()
    }

    /// Wait until the producer reaches `Terminated`
    pub async fn terminated(&mut self) {
        let _ = self
            .state
            .wait_for(|state| *state == ProducerState::Terminated)
            .await;
    }

    /// Drop the reader and wait for the background task to exit
    pub async fn join(self) {
        drop(self.items);
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use crate::shutdown::shutdown_channel;
    use crate::ProducerError;

    fn streaming(backend: MockBackend) -> StreamingProducer<MockBackend> {
        StreamingProducer::new(Producer::new(backend), 1)
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_are_sequenced() {
        let stream = streaming(MockBackend::fixed("joe", 10));
        let (_handle, listener) = shutdown_channel();
        let mut handle = stream.start(Query::new("boring"), listener);

        for expected in 1..=3 {
            let item = handle.next().await.unwrap();
            assert_eq!(item.seq, expected);
            assert_eq!(item.result, "joe result for \"boring\"");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_acknowledged_and_stream_ends() {
        let stream = streaming(MockBackend::fixed("joe", 10));
        let (shutdown, listener) = shutdown_channel();
        let mut handle = stream.start(Query::new("boring"), listener);

        let first = handle.collect_until_idle(Duration::from_secs(1), 3);
        assert_eq!(first.await.len(), 3);

        let ack = shutdown.shutdown("bye").await.unwrap();
        assert_eq!(ack.message, "see you");
        handle.terminated().await;

        let mut trailing = Vec::new();
        while let Some(item) = handle.next().await {
            trailing.push(item.seq);
        }
        assert!(trailing.is_empty(), "got {trailing:?} after shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_items_discarded_after_ack() {
        let stream = StreamingProducer::new(Producer::new(MockBackend::fixed("joe", 10)), 4);
        let (shutdown, listener) = shutdown_channel();
        let mut handle = stream.start(Query::new("boring"), listener);

        assert_eq!(handle.next().await.unwrap().seq, 1);
        tokio::time::sleep(Duration::from_millis(45)).await;

        let ack = shutdown.shutdown("bye").await.unwrap();
        assert_eq!(ack.message, "see you");

        let mut trailing = Vec::new();
        while let Some(item) = handle.next().await {
            trailing.push(item.seq);
        }
        assert!(trailing.is_empty(), "got {trailing:?} after shutdown");

        let late = handle
            .collect_until_idle(Duration::from_secs(1), 10)
            .await;
        assert!(late.is_empty());
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_until_idle_stops_on_slow_stream() {
        let stream = streaming(MockBackend::fixed("slow", 1_500));
        let (_shutdown, listener) = shutdown_channel();
        let mut handle = stream.start(Query::new("boring"), listener);

        let items = handle
            .collect_until_idle(Duration::from_secs(1), 10)
            .await;
        assert!(items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_reader_terminates_stream() {
        let stream = streaming(MockBackend::fixed("joe", 5));
        let (shutdown, listener) = shutdown_channel();
        let handle = stream.start(Query::new("boring"), listener);

        handle.join().await;
        let err = shutdown.shutdown("late").await.unwrap_err();
        assert_eq!(err, ProducerError::AlreadyTerminated);
    }
}
