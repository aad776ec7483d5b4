//! Cooperative shutdown channel
//!
//! Two-message protocol between a caller and one long-lived producer:
//! the caller sends a [`ShutdownRequest`], the producer cleans up and answers
//! with exactly one [`Acknowledgement`]. A request sent with
//! [`ShutdownHandle::request`] is fire-and-forget and expects no answer.

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{ProducerError, Result};

/// Producer lifecycle.
///
/// `Running -> CleaningUp -> Terminated` on shutdown,
/// `Running -> Terminated` on normal completion. Termination is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Running,
    CleaningUp,
    Terminated,
}

/// Answer sent back by a producer once its cleanup is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Name of the acknowledging producer
    pub producer: String,
    /// Parting message
    pub message: String,
}

/// A shutdown request as seen by the producer
#[derive(Debug)]
pub struct ShutdownRequest {
    reason: String,
    ack: Option<oneshot::Sender<Acknowledgement>>,
}

impl ShutdownRequest {
    /// Reason given by the caller
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Whether the caller is waiting for an acknowledgement
    pub fn wants_ack(&self) -> bool {
        self.ack.is_some()
    }

    /// Send the acknowledgement, consuming the request.
    ///
    /// Returns false when the caller did not ask for one or stopped waiting.
    pub fn acknowledge(self, producer: &str, message: impl Into<String>) -> bool {
        match self.ack {
            Some(tx) => tx
                .send(Acknowledgement {
                    producer: producer.to_string(),
                    message: message.into(),
                })
                .is_ok(),
            None => false,
        }
    }
}

/// Create a connected caller/producer pair
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownListener) {
    let (tx, rx) = oneshot::channel();
    (ShutdownHandle { tx }, ShutdownListener { rx: Some(rx) })
}

/// Caller side of the shutdown channel
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: oneshot::Sender<ShutdownRequest>,
}

impl ShutdownHandle {
    /// Fire-and-forget quit signal
    pub fn request(self, reason: impl Into<String>) -> Result<()> {
        let request = ShutdownRequest {
            reason: reason.into(),
            ack: None,
        };
        self.tx
            .send(request)
            .map_err(|_| ProducerError::AlreadyTerminated)
    }

    /// Ask the producer to stop and wait until it confirms cleanup is done
    pub async fn shutdown(self, reason: impl Into<String>) -> Result<Acknowledgement> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let request = ShutdownRequest {
            reason: reason.into(),
            ack: Some(ack_tx),
        };
        self.tx
            .send(request)
            .map_err(|_| ProducerError::AlreadyTerminated)?;

        let ack = ack_rx
            .await
            .map_err(|_| ProducerError::AcknowledgmentDropped)?;
        debug!(producer = %ack.producer, message = %ack.message, "shutdown acknowledged");
        Ok(ack)
    }

    /// The producer has terminated and dropped its listener
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Producer side of the shutdown channel
#[derive(Debug)]
pub struct ShutdownListener {
    rx: Option<oneshot::Receiver<ShutdownRequest>>,
}

impl ShutdownListener {
    /// Wait for a shutdown request.
    ///
    /// Cancel safe. If the caller drops its handle without sending anything,
    /// this never resolves: nobody can ask for a shutdown any more.
    pub async fn requested(&mut self) -> ShutdownRequest {
        if let Some(rx) = self.rx.as_mut() {
            let outcome = rx.await;
            self.rx = None;
            if let Ok(request) = outcome {
                return request;
            }
        }
        std::future::pending().await
    }

    /// Stop accepting requests and return one that slipped in before closing.
    ///
    /// Called by a producer that finishes on its own so a request racing
    /// with completion is still acknowledged instead of dropped.
    pub fn close(&mut self) -> Option<ShutdownRequest> {
        let mut rx = self.rx.take()?;
        rx.close();
        rx.try_recv().ok()
    }
}
