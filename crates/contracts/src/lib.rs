//! # Contracts
//!
//! Shared interface contracts for the fan-in dispatcher.
//! Every other crate depends on this one; reverse dependencies are prohibited.
//!
//! ## Model
//! - A [`Query`] is sent unchanged to every replica of every category
//! - A replica answers through the [`SearchBackend`] capability
//! - The dispatcher answers with an [`Aggregation`] in completion order

mod aggregation;
mod backend;
mod blueprint;
mod error;
mod query;

pub use aggregation::*;
pub use backend::{LocalSearchBackend, SearchBackend};
pub use blueprint::*;
pub use error::*;
pub use query::{Query, SearchResult};
