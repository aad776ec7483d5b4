//! Pipeline orchestrator - turns a blueprint into mock replicas and drives
//! the dispatcher over them.

use std::time::Instant;

use anyhow::Result;
use contracts::{FanInBlueprint, Query, RaceOutcome};
use dispatcher::{build_categories, create_dispatcher, Category, Dispatcher};
use producer::MockBackend;
use tracing::{debug, info, instrument};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated configuration, CLI overrides already applied
    pub blueprint: FanInBlueprint,

    /// Number of aggregations to run
    pub repeat: u32,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    categories: Vec<Category<MockBackend>>,
    dispatcher: Dispatcher,
}

impl Pipeline {
    /// Create the replicas and the dispatcher described by `config`
    pub fn new(config: PipelineConfig) -> Self {
        let categories = build_categories(&config.blueprint.categories, |category, replica| {
            debug!(
                category,
                replica = %replica.name,
                delay = ?replica.delay,
                "Creating mock replica"
            );
            MockBackend::from_config(replica)
        });
        let dispatcher = create_dispatcher(&config.blueprint.request);

        Self {
            config,
            categories,
            dispatcher,
        }
    }

    fn query(&self) -> Query {
        Query::new(&self.config.blueprint.request.query)
    }

    /// Run every configured aggregation
    #[instrument(name = "pipeline_run", skip(self), fields(repeat = self.config.repeat))]
    pub async fn run(&self) -> Result<PipelineStats> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let start_time = Instant::now();
        let query = self.query();
        let mut stats = PipelineStats::default();

        for run in 1..=self.config.repeat {
            let aggregation = self
                .dispatcher
                .aggregate(query.clone(), &self.categories)
                .await
                .map_err(CliError::from)?;

            debug!(
                run,
                collected = aggregation.len(),
                timed_out = aggregation.timed_out(),
                "Aggregation finished"
            );
            stats.aggregations.update(&aggregation);
            stats.last = Some(aggregation);
        }

        stats.runs = self.config.repeat;
        stats.duration = start_time.elapsed();
        stats.dispatcher = self.dispatcher.metrics();
        Ok(stats)
    }

    /// Race a single category by name
    #[instrument(name = "pipeline_race", skip(self))]
    pub async fn race(&self, category: &str) -> Result<RaceOutcome, CliError> {
        let found = self
            .categories
            .iter()
            .find(|c| c.name() == category)
            .ok_or_else(|| {
                CliError::unknown_category(category, self.categories.iter().map(Category::name))
            })?;

        Ok(self.dispatcher.race(&self.query(), found).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        CategoryConfig, ConfigVersion, DelayProfile, ReplicaConfig, RequestConfig,
        StragglerPolicy,
    };

    fn blueprint(deadline_ms: u64) -> FanInBlueprint {
        let replica = |name: &str, delay: DelayProfile| ReplicaConfig {
            name: name.into(),
            delay,
        };
        FanInBlueprint {
            version: ConfigVersion::V1,
            request: RequestConfig {
                query: "golang".into(),
                deadline_ms,
                straggler_policy: StragglerPolicy::Detach,
            },
            categories: vec![
                CategoryConfig {
                    name: "web".into(),
                    replicas: vec![
                        replica("web1", DelayProfile::Fixed { ms: 30 }),
                        replica("web2", DelayProfile::Fixed { ms: 10 }),
                    ],
                },
                CategoryConfig {
                    name: "video".into(),
                    replicas: vec![replica("video1", DelayProfile::Never)],
                },
            ],
        }
    }

    fn pipeline(deadline_ms: u64, repeat: u32) -> Pipeline {
        Pipeline::new(PipelineConfig {
            blueprint: blueprint(deadline_ms),
            repeat,
            metrics_port: None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_runs_are_summarized() {
        let stats = pipeline(50, 3).run().await.unwrap();

        assert_eq!(stats.runs, 3);
        assert_eq!(stats.aggregations.total_runs, 3);
        assert_eq!(stats.aggregations.timed_out_runs, 3);
        assert_eq!(stats.aggregations.missing_counts.get("video"), Some(&3));
        assert_eq!(stats.dispatcher.aggregations, 3);

        let last = stats.last.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last.hits[0].replica, "web2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_known_category() {
        let outcome = pipeline(50, 1).race("web").await.unwrap();
        assert_eq!(outcome.replica, "web2");
        assert_eq!(outcome.result, "web2 result for \"golang\"");
    }

    #[tokio::test]
    async fn test_race_unknown_category() {
        let err = pipeline(50, 1).race("news").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("news"), "got: {message}");
        assert!(message.contains("web, video"), "got: {message}");
    }
}
