//! SearchBackend trait - the query capability behind every producer
//!
//! The dispatcher never knows how a replica answers, only that it eventually
//! does (or never does).

use crate::{Query, SearchResult};

/// Query capability of a single replica.
///
/// Implementations model a backend with latency but no failure mode: `search`
/// either resolves with a result or never resolves at all.
#[trait_variant::make(SearchBackend: Send)]
pub trait LocalSearchBackend {
    /// Replica name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Answer the query
    async fn search(&self, query: &Query) -> SearchResult;

    /// Bounded cleanup run by a cancellable producer before it acknowledges
    /// a shutdown request.
    fn release(&self) {}
}
