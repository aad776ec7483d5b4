//! FanInBlueprint - Config Loader output
//!
//! Describes one fan-in request: the query, its deadline, and the replica
//! groups that answer it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete fan-in configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FanInBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Query, deadline and straggler handling
    #[validate(nested)]
    pub request: RequestConfig,

    /// Replica groups, one race per entry
    #[validate(length(min = 1, message = "at least one category is required"), nested)]
    pub categories: Vec<CategoryConfig>,
}

impl FanInBlueprint {
    /// Total number of replicas across all categories
    pub fn replica_count(&self) -> usize {
        self.categories.iter().map(|c| c.replicas.len()).sum()
    }

    /// Find a category by name
    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Request settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestConfig {
    /// Query text sent to every replica
    #[validate(length(min = 1, message = "query cannot be empty"))]
    pub query: String,

    /// Global deadline in milliseconds (0 = immediate timeout)
    pub deadline_ms: u64,

    /// What happens to producers whose result is no longer wanted
    #[serde(default)]
    pub straggler_policy: StragglerPolicy,
}

impl RequestConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Handling of losing replicas and of racers still running at the deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StragglerPolicy {
    /// Leave them running untracked until they finish on their own
    #[default]
    Detach,
    /// Cancel losers once a race is decided and everything still in flight
    /// once the deadline fires
    Cancel,
}

/// One replica group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryConfig {
    /// Unique category name (e.g., "web")
    #[validate(length(min = 1, message = "category name cannot be empty"))]
    pub name: String,

    /// Redundant replicas answering for this category
    #[validate(length(min = 1, message = "at least one replica is required"), nested)]
    pub replicas: Vec<ReplicaConfig>,
}

/// One replica of a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReplicaConfig {
    /// Replica name, unique within its category (e.g., "web1")
    #[validate(length(min = 1, message = "replica name cannot be empty"))]
    pub name: String,

    /// Simulated response latency
    #[serde(default)]
    pub delay: DelayProfile,
}

/// Simulated latency of a mock replica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelayProfile {
    /// Always answer after `ms` milliseconds
    Fixed { ms: u64 },
    /// Answer after a uniformly random delay in `[min_ms, max_ms]`
    Uniform { min_ms: u64, max_ms: u64 },
    /// Never answer
    Never,
}

impl Default for DelayProfile {
    fn default() -> Self {
        Self::Uniform {
            min_ms: 0,
            max_ms: 99,
        }
    }
}
