//! Error types for CLI operations.

use thiserror::Error;

use contracts::ContractError;
use dispatcher::DispatcherError;
use producer::ProducerError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Requested category is not configured
    #[error("Unknown category '{name}' (configured: {known})")]
    UnknownCategory { name: String, known: String },

    /// Dispatching failed before any result could be collected
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatcherError),

    /// Shutdown handshake with a producer failed
    #[error("Shutdown handshake failed: {0}")]
    Shutdown(#[from] ProducerError),

    /// Stopped by Ctrl+C or SIGTERM
    #[error("Interrupted by signal")]
    Interrupted,
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn unknown_category<'a>(
        name: impl Into<String>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::UnknownCategory {
            name: name.into(),
            known: known.into_iter().collect::<Vec<_>>().join(", "),
        }
    }
}
