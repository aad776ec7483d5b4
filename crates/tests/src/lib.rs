//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端场景：竞速、扇入、截止时间、协作关闭
//! - 性质测试 (排列无关、不超收、归属正确)
//!
//! 所有计时测试都在暂停的 tokio 时钟下运行，固定延迟是确定的。

#[cfg(test)]
mod contract_tests {
    use contracts::{DelayProfile, StragglerPolicy};

    #[test]
    fn test_contract_defaults() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(StragglerPolicy::default(), StragglerPolicy::Detach);
        assert_eq!(
            DelayProfile::default(),
            DelayProfile::Uniform {
                min_ms: 0,
                max_ms: 99
            }
        );
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/search.toml");
        let blueprint = config_loader::ConfigLoader::load_from_path(std::path::Path::new(path))
            .expect("shipped config must be valid");

        assert_eq!(blueprint.categories.len(), 3);
        assert_eq!(blueprint.replica_count(), 6);
        assert_eq!(blueprint.request.deadline_ms, 80);
    }
}

/// Shared helpers
#[cfg(test)]
mod support {
    use std::time::Duration;

    use dispatcher::Category;
    use producer::{MockBackend, Producer};

    /// Category whose replicas are named `<name>1`, `<name>2`, ... with fixed delays
    pub fn fixed_category(name: &str, delays_ms: &[u64]) -> Category<MockBackend> {
        Category::from_backends(
            name,
            delays_ms
                .iter()
                .enumerate()
                .map(|(i, ms)| MockBackend::fixed(format!("{name}{}", i + 1), *ms)),
        )
    }

    /// Category built from already wrapped producers
    pub fn category_of(name: &str, producers: &[Producer<MockBackend>]) -> Category<MockBackend> {
        Category::new(name, producers.to_vec())
    }

    pub fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use contracts::Query;
    use dispatcher::{aggregate, race, Category, Dispatcher, DispatcherConfig, DispatcherError};
    use producer::{shutdown_channel, MockBackend, Producer, ProducerError, ProducerState};
    use tokio::time::{sleep, Instant};

    use crate::support::{fixed_category, ms};

    /// Every category answers well before the deadline: one result per
    /// category, each from the faster replica.
    #[tokio::test(start_paused = true)]
    async fn test_all_categories_answer() {
        let categories = vec![
            fixed_category("web", &[10, 50]),
            fixed_category("image", &[50, 10]),
            fixed_category("video", &[10, 50]),
        ];

        let aggregation = aggregate(Query::new("golang"), &categories, ms(1000))
            .await
            .unwrap();

        assert_eq!(aggregation.len(), 3);
        assert!(!aggregation.timed_out());
        assert_eq!(
            aggregation.hit("web").unwrap().result,
            "web1 result for \"golang\""
        );
        assert_eq!(
            aggregation.hit("image").unwrap().result,
            "image2 result for \"golang\""
        );
        assert_eq!(
            aggregation.hit("video").unwrap().result,
            "video1 result for \"golang\""
        );
    }

    /// One category is too slow for the deadline: two results and a timeout.
    #[tokio::test(start_paused = true)]
    async fn test_slow_category_misses_deadline() {
        let dispatcher = Dispatcher::new(DispatcherConfig::new(ms(80)));
        let categories = vec![
            fixed_category("web", &[10, 30]),
            fixed_category("image", &[20]),
            fixed_category("video", &[500]),
        ];

        let aggregation = dispatcher
            .aggregate(Query::new("golang"), &categories)
            .await
            .unwrap();

        assert_eq!(aggregation.len(), 2);
        assert!(aggregation.timed_out());
        assert!(aggregation.is_partial());
        assert_eq!(aggregation.meta.missing, vec!["video".to_string()]);
        assert_eq!(dispatcher.metrics().timed_out, 1);
    }

    /// A zero deadline is already expired: nothing is collected, even from a
    /// replica that answers at time zero.
    #[tokio::test(start_paused = true)]
    async fn test_zero_deadline_boundary() {
        let categories = vec![fixed_category("web", &[0])];

        let aggregation = aggregate(Query::new("golang"), &categories, ms(0))
            .await
            .unwrap();

        assert_eq!(aggregation.len(), 0);
        assert!(aggregation.timed_out());
        assert_eq!(aggregation.meta.missing, vec!["web".to_string()]);
    }

    /// A result ready exactly at the deadline loses to the deadline.
    #[tokio::test(start_paused = true)]
    async fn test_result_at_deadline_is_dropped() {
        let categories = vec![fixed_category("web", &[5]), fixed_category("video", &[40])];

        let aggregation = aggregate(Query::new("golang"), &categories, ms(40))
            .await
            .unwrap();

        assert_eq!(aggregation.len(), 1);
        assert!(aggregation.hit("video").is_none());
    }

    #[tokio::test]
    async fn test_race_without_replicas_fails_fast() {
        let empty: Category<MockBackend> = Category::new("web", Vec::new());

        let err = tokio::time::timeout(ms(100), race(&Query::new("golang"), &empty))
            .await
            .expect("must not block")
            .unwrap_err();

        assert_eq!(err, DispatcherError::empty_category("web"));
    }

    /// Shutdown before the result is ready: one acknowledgement, no result.
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_flight() {
        let backend = Arc::new(MockBackend::fixed("video1", 500));
        let producer = Producer::from_arc(Arc::clone(&backend));
        let (shutdown, listener) = shutdown_channel();

        let mut task = producer.start_cancellable(Query::new("golang"), listener);
        sleep(ms(100)).await;
        assert_eq!(task.state(), ProducerState::Running);

        let ack = shutdown.shutdown("deadline passed").await.unwrap();
        assert_eq!(ack.producer, "video1");

        task.terminated().await;
        sleep(ms(1000)).await;
        assert!((&mut task.result).await.is_err());
        assert_eq!(backend.released(), 1);
        assert_eq!(producer.metrics().snapshot().delivered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_aggregation_is_independent() {
        let dispatcher = Dispatcher::new(DispatcherConfig::new(ms(30)));
        let categories = vec![fixed_category("web", &[10]), fixed_category("video", &[50])];

        let first = dispatcher
            .aggregate(Query::new("first"), &categories)
            .await
            .unwrap();
        let started = Instant::now();
        let second = dispatcher
            .aggregate(Query::new("second"), &categories)
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second.hits[0].result, "web1 result for \"second\"");
        assert!(started.elapsed() <= ms(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_shutdown_reports_terminated() {
        let producer = Producer::new(MockBackend::fixed("web1", 5));
        let (shutdown, listener) = shutdown_channel();

        let task = producer.start_cancellable(Query::new("golang"), listener);
        assert_eq!(task.result.await.unwrap(), "web1 result for \"golang\"");
        task.join.await.unwrap();

        assert_eq!(
            shutdown.shutdown("too late").await.unwrap_err(),
            ProducerError::AlreadyTerminated
        );
    }
}

#[cfg(test)]
mod straggler_tests {
    use std::sync::Arc;

    use contracts::{Query, StragglerPolicy};
    use dispatcher::DispatcherBuilder;
    use producer::{MockBackend, Producer, ProducerMetrics};
    use tokio::time::sleep;

    use crate::support::{category_of, fixed_category, ms};

    fn slow_producers(metrics: &Arc<ProducerMetrics>) -> Vec<Producer<MockBackend>> {
        (1..=3)
            .map(|i| {
                Producer::new(MockBackend::fixed(format!("video{i}"), 200))
                    .with_metrics(Arc::clone(metrics))
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_lets_stragglers_finish() {
        let metrics = Arc::new(ProducerMetrics::new());
        let categories = vec![
            fixed_category("web", &[10]),
            category_of("video", &slow_producers(&metrics)),
        ];
        let dispatcher = DispatcherBuilder::new(ms(50)).build();

        let aggregation = dispatcher
            .aggregate(Query::new("golang"), &categories)
            .await
            .unwrap();
        assert!(aggregation.timed_out());
        assert_eq!(metrics.snapshot().running(), 3);

        sleep(ms(500)).await;
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.delivered, 3);
        assert_eq!(snapshot.cancelled, 0);
        assert_eq!(dispatcher.metrics().late_results, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_stragglers_at_deadline() {
        let metrics = Arc::new(ProducerMetrics::new());
        let categories = vec![
            fixed_category("web", &[10]),
            category_of("video", &slow_producers(&metrics)),
        ];
        let dispatcher = DispatcherBuilder::new(ms(50))
            .straggler_policy(StragglerPolicy::Cancel)
            .build();

        let aggregation = dispatcher
            .aggregate(Query::new("golang"), &categories)
            .await
            .unwrap();
        assert!(aggregation.timed_out());

        sleep(ms(500)).await;
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cancelled, 3);
        assert_eq!(snapshot.delivered, 0);
        assert_eq!(snapshot.running(), 0);
        assert_eq!(dispatcher.metrics().late_results, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_race_losers() {
        let metrics = Arc::new(ProducerMetrics::new());
        let mut producers = slow_producers(&metrics);
        producers.push(Producer::new(MockBackend::fixed("video4", 5)));
        let categories = vec![category_of("video", &producers)];
        let dispatcher = DispatcherBuilder::new(ms(1000))
            .straggler_policy(StragglerPolicy::Cancel)
            .build();

        let aggregation = dispatcher
            .aggregate(Query::new("golang"), &categories)
            .await
            .unwrap();
        assert_eq!(aggregation.hits[0].replica, "video4");

        sleep(ms(10)).await;
        assert_eq!(metrics.snapshot().cancelled, 3);
    }
}

#[cfg(test)]
mod property_tests {
    use std::collections::HashSet;

    use contracts::Query;
    use dispatcher::{aggregate, race, Category};
    use producer::{
        shutdown_channel, MockBackend, Producer, ProducerState, StreamingProducer,
    };
    use tokio::time::Instant;

    use crate::support::{fixed_category, ms};

    fn permutations(items: &[u64]) -> Vec<Vec<u64>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut all = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                all.push(tail);
            }
        }
        all
    }

    fn uniform_category(name: &str, replicas: usize, max_ms: u64) -> Category<MockBackend> {
        Category::from_backends(
            name,
            (1..=replicas).map(|i| MockBackend::uniform(format!("{name}-{i}"), 0, max_ms)),
        )
    }

    /// The fastest replica wins no matter where it sits in the list.
    #[tokio::test(start_paused = true)]
    async fn test_race_is_order_independent() {
        for delays in permutations(&[30, 10, 20, 40]) {
            let category = Category::from_backends(
                "web",
                delays
                    .iter()
                    .map(|d| MockBackend::fixed(format!("web-{d}ms"), *d)),
            );

            let started = Instant::now();
            let outcome = race(&Query::new("golang"), &category).await.unwrap();

            let elapsed = started.elapsed();
            assert_eq!(outcome.replica, "web-10ms", "order {delays:?}");
            assert!(elapsed >= ms(10) && elapsed < ms(20), "order {delays:?}: {elapsed:?}");
        }
    }

    /// Whatever wins was produced by one of the raced replicas.
    #[tokio::test(start_paused = true)]
    async fn test_race_result_comes_from_a_replica() {
        let category = uniform_category("image", 4, 50);
        let names: HashSet<String> = category
            .replicas()
            .iter()
            .map(|p| p.name().to_string())
            .collect();

        for _ in 0..20 {
            let outcome = race(&Query::new("golang"), &category).await.unwrap();
            assert!(names.contains(&outcome.replica));
            assert_eq!(
                outcome.result,
                format!("{} result for \"golang\"", outcome.replica).as_str()
            );
        }
    }

    /// Returns by the deadline, never collects more than it asked for, and
    /// every result belongs to the category it is reported under.
    #[tokio::test(start_paused = true)]
    async fn test_bound_collection_and_attribution() {
        let mut categories: Vec<_> = ["web", "image", "video", "news"]
            .iter()
            .map(|name| uniform_category(name, 3, 120))
            .collect();
        categories.push(Category::from_backends(
            "hung",
            vec![MockBackend::never("hung-1"), MockBackend::never("hung-2")],
        ));

        for deadline in [0, 1, 17, 50, 80, 200] {
            for _ in 0..5 {
                let started = Instant::now();
                let aggregation = aggregate(Query::new("golang"), &categories, ms(deadline))
                    .await
                    .unwrap();

                assert!(started.elapsed() <= ms(deadline + 1), "deadline {deadline}");
                assert!(aggregation.len() <= categories.len());
                assert!(aggregation.timed_out(), "the hung category never answers");

                let mut seen = HashSet::new();
                for hit in &aggregation.hits {
                    assert!(seen.insert(hit.category.clone()), "category reported twice");
                    assert!(
                        hit.replica.starts_with(&format!("{}-", hit.category)),
                        "{} attributed to {}",
                        hit.replica,
                        hit.category
                    );
                    assert!(hit.result.as_str().starts_with(&hit.replica));
                    assert!(hit.latency < ms(deadline));
                }
            }
        }
    }

    /// Categories ready at the same instant may arrive in any order, but
    /// each is reported exactly once.
    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_categories_all_collected() {
        let categories = vec![
            fixed_category("a", &[10]),
            fixed_category("b", &[10]),
            fixed_category("c", &[10]),
        ];

        for _ in 0..5 {
            let aggregation = aggregate(Query::new("golang"), &categories, ms(80))
                .await
                .unwrap();

            assert_eq!(aggregation.len(), 3);
            assert!(!aggregation.timed_out());
            let hit: HashSet<_> = aggregation.hits.iter().map(|h| h.category.as_str()).collect();
            assert_eq!(hit, HashSet::from(["a", "b", "c"]));
        }
    }

    /// Everything strictly before the deadline means a complete response.
    #[tokio::test(start_paused = true)]
    async fn test_no_spurious_partiality() {
        let categories = vec![
            fixed_category("web", &[79, 200]),
            fixed_category("image", &[1]),
            fixed_category("video", &[300, 40]),
        ];

        let aggregation = aggregate(Query::new("golang"), &categories, ms(80))
            .await
            .unwrap();

        assert_eq!(aggregation.len(), categories.len());
        assert!(!aggregation.timed_out());
        assert!(!aggregation.is_partial());
        let order: Vec<_> = aggregation.hits.iter().map(|h| h.category.as_str()).collect();
        assert_eq!(order, vec!["image", "video", "web"]);
    }

    /// One acknowledgement per shutdown, and a stream stays silent afterwards.
    #[tokio::test(start_paused = true)]
    async fn test_stream_silent_after_acknowledgement() {
        let stream = StreamingProducer::new(Producer::new(MockBackend::uniform("joe", 0, 30)), 2);
        let (shutdown, listener) = shutdown_channel();
        let mut handle = stream.start(Query::new("boring"), listener);

        let before = handle.collect_until_idle(ms(1000), 5).await;
        assert_eq!(before.len(), 5);
        let seqs: Vec<u64> = before.iter().map(|item| item.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);

        let ack = shutdown.shutdown("bye").await.unwrap();
        assert_eq!(ack.producer, "joe");
        handle.terminated().await;
        assert_eq!(handle.state(), ProducerState::Terminated);

        let mut trailing = Vec::new();
        while let Some(item) = handle.next().await {
            trailing.push(item.seq);
        }
        assert!(trailing.is_empty(), "results after acknowledgement: {trailing:?}");
    }
}

#[cfg(test)]
mod stats_tests {
    use contracts::Query;
    use dispatcher::{Dispatcher, DispatcherConfig};
    use observability::AggregationStatsAggregator;

    use crate::support::{fixed_category, ms};

    #[tokio::test(start_paused = true)]
    async fn test_repeated_aggregations_summary() {
        let dispatcher = Dispatcher::new(DispatcherConfig::new(ms(25)));
        let categories = vec![fixed_category("web", &[10, 5]), fixed_category("video", &[40])];
        let mut stats = AggregationStatsAggregator::new();

        for _ in 0..4 {
            let aggregation = dispatcher
                .aggregate(Query::new("golang"), &categories)
                .await
                .unwrap();
            stats.update(&aggregation);
        }

        let summary = stats.summary();
        assert_eq!(summary.total_runs, 4);
        assert_eq!(summary.timed_out_runs, 4);
        assert_eq!(summary.missing_counts.get("video"), Some(&4));
        assert_eq!(summary.win_counts["web"].get("web2"), Some(&4));
        assert_eq!(summary.latency_ms.count, 4);
    }
}
