//! Dispatcher - deadline-bounded fan-in over category races

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    Aggregation, AggregationMeta, CategoryHit, Query, RaceOutcome, RequestConfig, SearchBackend,
    StragglerPolicy,
};

use crate::category::Category;
use crate::error::DispatcherError;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::racer::race_with_policy;

/// Dispatcher configuration
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// How long an aggregation waits for categories
    pub deadline: Duration,
    /// What happens to work nobody waits for any more
    pub straggler_policy: StragglerPolicy,
}

impl DispatcherConfig {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            straggler_policy: StragglerPolicy::default(),
        }
    }
}

impl From<&RequestConfig> for DispatcherConfig {
    fn from(request: &RequestConfig) -> Self {
        Self {
            deadline: request.deadline(),
            straggler_policy: request.straggler_policy,
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    metrics: Option<Arc<DispatcherMetrics>>,
}

impl DispatcherBuilder {
    pub fn new(deadline: Duration) -> Self {
        Self {
            config: DispatcherConfig::new(deadline),
            metrics: None,
        }
    }

    pub fn straggler_policy(mut self, policy: StragglerPolicy) -> Self {
        self.config.straggler_policy = policy;
        self
    }

    /// Share counters with other dispatchers
    pub fn metrics(mut self, metrics: Arc<DispatcherMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            config: self.config,
            metrics: self.metrics.unwrap_or_default(),
        }
    }
}

/// Fans a query out to every category and collects what arrives in time.
///
/// Holds no per-request state; one dispatcher can serve any number of
/// concurrent aggregations.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatcherConfig,
    metrics: Arc<DispatcherMetrics>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(DispatcherMetrics::new()),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Race a single category under this dispatcher's straggler policy
    pub async fn race<B>(
        &self,
        query: &Query,
        category: &Category<B>,
    ) -> Result<RaceOutcome, DispatcherError>
    where
        B: SearchBackend + Sync + 'static,
    {
        let outcome = race_with_policy(query, category, self.config.straggler_policy, None).await;
        match &outcome {
            Ok(won) => {
                self.metrics.inc_races_won();
                observability::record_race(category.name(), won);
            }
            Err(_) => self.metrics.inc_races_lost(),
        }
        outcome
    }

    /// Race every category concurrently and return the results that
    /// arrived strictly before the deadline, in arrival order.
    ///
    /// Fails only when a category has no replicas, before anything starts.
    #[instrument(
        name = "aggregate",
        skip(self, categories),
        fields(
            categories = categories.len(),
            deadline_ms = self.config.deadline.as_millis() as u64,
            policy = ?self.config.straggler_policy
        )
    )]
    pub async fn aggregate<B>(
        &self,
        query: Query,
        categories: &[Category<B>],
    ) -> Result<Aggregation, DispatcherError>
    where
        B: SearchBackend + Sync + 'static,
    {
        if let Some(empty) = categories.iter().find(|category| category.is_empty()) {
            return Err(DispatcherError::empty_category(empty.name()));
        }

        let started = Instant::now();
        let deadline = started + self.config.deadline;
        let requested = categories.len();
        self.metrics.inc_aggregations();

        let stragglers = CancellationToken::new();
        // Under Cancel, racers must not outlive this call, even if the
        // caller drops the future before the deadline.
        let _stragglers_guard = (self.config.straggler_policy == StragglerPolicy::Cancel)
            .then(|| stragglers.clone().drop_guard());
        let (tx, mut rx) = mpsc::channel(requested.max(1));

        for (index, category) in categories.iter().enumerate() {
            let tx = tx.clone();
            let query = query.clone();
            let category = category.clone();
            let policy = self.config.straggler_policy;
            let stragglers = stragglers.clone();
            let metrics = Arc::clone(&self.metrics);

            tokio::spawn(async move {
                match race_with_policy(&query, &category, policy, Some(&stragglers)).await {
                    Ok(outcome) => {
                        metrics.inc_races_won();
                        observability::record_race(category.name(), &outcome);
                        if tx.send((index, outcome)).await.is_err() {
                            metrics.inc_late_results();
                            debug!(category = %category.name(), "result arrived after the deadline, dropped");
                        }
                    }
                    Err(DispatcherError::Cancelled { category }) => {
                        debug!(category = %category, "race cancelled after the deadline");
                    }
                    Err(e) => {
                        metrics.inc_races_lost();
                        error!(category = %category.name(), error = %e, "category lost");
                    }
                }
            });
        }
        drop(tx);

        let mut hits = Vec::with_capacity(requested);
        let mut received = vec![false; requested];
        let mut timed_out = false;

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        while hits.len() < requested {
            if Instant::now() >= deadline {
                timed_out = true;
                break;
            }

            tokio::select! {
                biased;

                _ = &mut sleep => {
                    timed_out = true;
                    break;
                }
                next = rx.recv() => match next {
                    Some((index, outcome)) => {
                        received[index] = true;
                        hits.push(CategoryHit {
                            category: categories[index].name().to_string(),
                            replica: outcome.replica,
                            result: outcome.result,
                            latency: started.elapsed(),
                        });
                    }
                    // Every remaining category lost all of its replicas
                    None => break,
                },
            }
        }
        drop(rx);

        let elapsed = started.elapsed();
        let missing: Vec<String> = categories
            .iter()
            .zip(&received)
            .filter(|(_, received)| !**received)
            .map(|(category, _)| category.name().to_string())
            .collect();

        if timed_out {
            self.metrics.inc_timed_out();
            warn!(
                query = %query,
                collected = hits.len(),
                requested,
                missing = ?missing,
                elapsed_ms = elapsed.as_millis() as u64,
                "aggregation timed out"
            );
            if self.config.straggler_policy == StragglerPolicy::Cancel {
                stragglers.cancel();
            }
        } else {
            info!(
                query = %query,
                collected = hits.len(),
                requested,
                elapsed_ms = elapsed.as_millis() as u64,
                "aggregation complete"
            );
        }

        let aggregation = Aggregation {
            hits,
            meta: AggregationMeta {
                requested,
                timed_out,
                elapsed,
                missing,
            },
        };
        observability::record_aggregation(&aggregation);
        Ok(aggregation)
    }
}

/// Convenience function to create a dispatcher from a request configuration
pub fn create_dispatcher(request: &RequestConfig) -> Dispatcher {
    Dispatcher::new(DispatcherConfig::from(request))
}

/// Aggregate with the default straggler policy
pub async fn aggregate<B>(
    query: Query,
    categories: &[Category<B>],
    timeout: Duration,
) -> Result<Aggregation, DispatcherError>
where
    B: SearchBackend + Sync + 'static,
{
    Dispatcher::new(DispatcherConfig::new(timeout))
        .aggregate(query, categories)
        .await
}
