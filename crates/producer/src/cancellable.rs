//! Cancellable producer - result delivery raced against cooperative shutdown

use std::sync::Arc;

use contracts::{Query, SearchBackend, SearchResult};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::producer::Producer;
use crate::shutdown::{ProducerState, ShutdownListener};

/// Message sent with every shutdown acknowledgement
const ACK_MESSAGE: &str = "see you";

/// Message sent when a request raced with normal completion
const ACK_ALREADY_DONE: &str = "already finished";

/// Handle to a running cancellable producer
#[derive(Debug)]
pub struct ProducerTask {
    /// Single-use result channel; errors if the producer shut down first
    pub result: oneshot::Receiver<SearchResult>,
    /// Lifecycle observer
    pub state: watch::Receiver<ProducerState>,
    /// Background task
    pub join: JoinHandle<()>,
}

impl ProducerTask {
    /// Current lifecycle state
    pub fn state(&self) -> ProducerState {
        *self.state.borrow()
    }

    /// Wait until the producer reaches `Terminated`
    pub async fn terminated(&mut self) {
        // The sender is dropped right after Terminated is published, so an
        // error here also means terminated.
        let _ = self
            .state
            .wait_for(|state| *state == ProducerState::Terminated)
            .await;
    }
}

impl<B: SearchBackend + Sync + 'static> Producer<B> {
    /// Start answering `query` while listening for a shutdown request.
    ///
    /// Whichever happens first wins: delivering the result, or observing the
    /// request. On shutdown the backend's `release` hook runs, the request is
    /// acknowledged if the caller waits for it, and no result is delivered.
    #[instrument(name = "producer_start_cancellable", skip(self, listener), fields(replica = %self.name()))]
    pub fn start_cancellable(&self, query: Query, mut listener: ShutdownListener) -> ProducerTask {
        let (result_tx, result_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(ProducerState::Running);
        let backend = Arc::clone(&self.backend);
        let metrics = Arc::clone(&self.metrics);
        metrics.record_started();

        let join = tokio::spawn(async move {
            let name = backend.name().to_string();

            tokio::select! {
                result = backend.search(&query) => {
                    metrics.record_delivered();
                    let _ = result_tx.send(result);
                    if let Some(request) = listener.close() {
                        debug!(replica = %name, reason = request.reason(), "shutdown raced completion");
                        request.acknowledge(&name, ACK_ALREADY_DONE);
                    }
                    state_tx.send_replace(ProducerState::Terminated);
                }
                request = listener.requested() => {
                    state_tx.send_replace(ProducerState::CleaningUp);
                    debug!(replica = %name, reason = request.reason(), "shutdown requested, cleaning up");

                    drop(result_tx);
                    backend.release();
                    metrics.record_shut_down();

                    request.acknowledge(&name, ACK_MESSAGE);
                    state_tx.send_replace(ProducerState::Terminated);
                }
            }
        });

        ProducerTask {
            result: result_rx,
            state: state_rx,
            join,
        }
    }
}
