//! Producer error types

use thiserror::Error;

/// Shutdown handshake errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProducerError {
    /// The producer already finished and no longer listens for shutdown
    #[error("producer already terminated")]
    AlreadyTerminated,

    /// The producer took the request but went away without acknowledging it
    #[error("producer dropped the shutdown request without acknowledging")]
    AcknowledgmentDropped,
}

/// Producer Result type alias
pub type Result<T> = std::result::Result<T, ProducerError>;
