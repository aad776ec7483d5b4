//! # Producer
//!
//! Leaf tasks of the fan-in dispatcher.
//!
//! Responsibilities:
//! - Start a replica against a query and hand back a single-use result channel
//! - Race result delivery against cooperative shutdown
//! - Stream successive results from long-lived replicas until told to stop
//! - Mock backends with fixed / random / infinite latency

pub mod cancellable;
pub mod error;
pub mod metrics;
pub mod mock;
pub mod producer;
pub mod shutdown;
pub mod stream;

pub use cancellable::ProducerTask;
pub use contracts::{Query, SearchBackend, SearchResult};
pub use error::{ProducerError, Result};
pub use metrics::{ProducerMetrics, ProducerMetricsSnapshot};
pub use mock::MockBackend;
pub use producer::Producer;
pub use shutdown::{
    shutdown_channel, Acknowledgement, ProducerState, ShutdownHandle, ShutdownListener,
    ShutdownRequest,
};
pub use stream::{StreamHandle, StreamItem, StreamingProducer};
