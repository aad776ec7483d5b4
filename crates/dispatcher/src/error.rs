//! Dispatcher error types
//!
//! Only structural problems are errors. A deadline that fires before every
//! category answered is reported through the aggregation itself.

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatcherError {
    /// A category was supplied without any replica
    #[error("category '{category}' has no replicas")]
    EmptyCategory { category: String },

    /// Every replica of a category went away without delivering
    #[error("all replicas of category '{category}' were lost before answering")]
    AllReplicasLost { category: String },

    /// The race was cancelled before any replica answered
    #[error("race for category '{category}' was cancelled")]
    Cancelled { category: String },
}

impl DispatcherError {
    pub fn empty_category(category: impl Into<String>) -> Self {
        Self::EmptyCategory {
            category: category.into(),
        }
    }

    pub fn all_replicas_lost(category: impl Into<String>) -> Self {
        Self::AllReplicasLost {
            category: category.into(),
        }
    }

    pub fn cancelled(category: impl Into<String>) -> Self {
        Self::Cancelled {
            category: category.into(),
        }
    }
}
