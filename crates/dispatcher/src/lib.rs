//! # Dispatcher
//!
//! Racing-replica fan-in.
//!
//! - Races the replicas of each category, first answer wins
//! - Fans the category winners into one response, in arrival order
//! - Stops waiting at a deadline and reports what arrived in time

pub mod category;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod racer;

pub use category::{build_categories, Category};
pub use contracts::{Aggregation, CategoryHit, Query, RaceOutcome, StragglerPolicy};
pub use dispatcher::{aggregate, create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use racer::{race, race_with_policy};
