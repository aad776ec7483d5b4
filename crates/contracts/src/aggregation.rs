//! Aggregation - Dispatcher output
//!
//! Results of one fan-in request, in category completion order.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::SearchResult;

/// Winner of a single replica race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceOutcome {
    /// Name of the replica that answered first
    pub replica: String,

    /// The winning result
    pub result: SearchResult,

    /// Time from race start to the first delivery
    pub latency: Duration,
}

impl RaceOutcome {
    pub fn into_result(self) -> SearchResult {
        self.result
    }
}

/// One category's contribution to an aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryHit {
    /// Category the result belongs to
    pub category: String,

    /// Replica that won the category race
    pub replica: String,

    /// The result itself
    pub result: SearchResult,

    /// Time from aggregation start to arrival
    pub latency: Duration,
}

/// Aggregation metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationMeta {
    /// Number of categories requested
    pub requested: usize,

    /// Whether the deadline fired before every category delivered
    pub timed_out: bool,

    /// Wall time spent waiting
    pub elapsed: Duration,

    /// Categories without a result (diagnostics only, not an error)
    pub missing: Vec<String>,
}

/// Fan-in response
///
/// `hits` is ordered by arrival, never by input position. It may be shorter
/// than `meta.requested`; a short list means "partial", not "failed".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aggregation {
    pub hits: Vec<CategoryHit>,
    pub meta: AggregationMeta,
}

impl Aggregation {
    /// Results in completion order
    pub fn results(&self) -> Vec<&SearchResult> {
        self.hits.iter().map(|hit| &hit.result).collect()
    }

    /// Consume into plain results, completion order preserved
    pub fn into_results(self) -> Vec<SearchResult> {
        self.hits.into_iter().map(|hit| hit.result).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Fewer results than categories requested
    pub fn is_partial(&self) -> bool {
        self.hits.len() < self.meta.requested
    }

    pub fn timed_out(&self) -> bool {
        self.meta.timed_out
    }

    /// Look up the hit for a category
    pub fn hit(&self, category: &str) -> Option<&CategoryHit> {
        self.hits.iter().find(|hit| hit.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(category: &str, content: &str, ms: u64) -> CategoryHit {
        CategoryHit {
            category: category.to_string(),
            replica: format!("{category}1"),
            result: SearchResult::new(content),
            latency: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_partial_aggregation() {
        let aggregation = Aggregation {
            hits: vec![hit("web", "w", 10), hit("image", "i", 20)],
            meta: AggregationMeta {
                requested: 3,
                timed_out: true,
                elapsed: Duration::from_millis(80),
                missing: vec!["video".to_string()],
            },
        };

        assert!(aggregation.is_partial());
        assert!(aggregation.timed_out());
        assert_eq!(aggregation.len(), 2);
        assert_eq!(aggregation.hit("image").map(|h| h.latency.as_millis()), Some(20));
        assert!(aggregation.hit("video").is_none());
    }

    #[test]
    fn test_results_keep_arrival_order() {
        let aggregation = Aggregation {
            hits: vec![hit("video", "v", 5), hit("web", "w", 9)],
            meta: AggregationMeta {
                requested: 2,
                ..Default::default()
            },
        };

        assert!(!aggregation.is_partial());
        let results = aggregation.into_results();
        assert_eq!(results, vec![SearchResult::from("v"), SearchResult::from("w")]);
    }
}
