//! Fan-in 指标收集模块
//!
//! 基于 Aggregation 收集和统计分发器的运行指标。

use std::collections::BTreeMap;

use contracts::{Aggregation, RaceOutcome};
use metrics::{counter, gauge, histogram};

/// 从 Aggregation 记录指标
///
/// 每次聚合结束时调用，超时与否都要记录。
///
/// # Example
///
/// ```ignore
/// let aggregation = dispatcher.aggregate(query, &categories).await?;
/// observability::metrics::record_aggregation(&aggregation);
/// ```
pub fn record_aggregation(aggregation: &Aggregation) {
    let meta = &aggregation.meta;

    counter!("fanin_aggregations_total").increment(1);
    histogram!("fanin_aggregation_latency_ms").record(meta.elapsed.as_secs_f64() * 1000.0);
    gauge!("fanin_aggregation_collected").set(aggregation.len() as f64);

    if meta.timed_out {
        counter!("fanin_aggregations_timed_out_total").increment(1);
    }

    for category in &meta.missing {
        counter!("fanin_categories_missing_total", "category" => category.clone()).increment(1);
    }
}

/// 记录单个类别的竞速结果
pub fn record_race(category: &str, outcome: &RaceOutcome) {
    counter!(
        "fanin_race_wins_total",
        "category" => category.to_string(),
        "replica" => outcome.replica.clone()
    )
    .increment(1);

    histogram!("fanin_race_latency_ms", "category" => category.to_string())
        .record(outcome.latency.as_secs_f64() * 1000.0);
}

/// 聚合指标聚合器
///
/// 在内存中累计多次聚合的结果，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct AggregationStatsAggregator {
    /// 聚合次数
    pub total_runs: u64,

    /// 超时次数
    pub timed_out_runs: u64,

    /// 结果不完整的次数
    pub partial_runs: u64,

    /// 聚合耗时统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 每次收集到的结果数
    pub collected_stats: RunningStats,

    /// 各类别缺失次数
    pub missing_counts: BTreeMap<String, u64>,

    /// 各类别中每个副本的胜出次数
    pub win_counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl AggregationStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, aggregation: &Aggregation) {
        self.total_runs += 1;
        if aggregation.timed_out() {
            self.timed_out_runs += 1;
        }
        if aggregation.is_partial() {
            self.partial_runs += 1;
        }

        self.latency_stats
            .push(aggregation.meta.elapsed.as_secs_f64() * 1000.0);
        self.collected_stats.push(aggregation.len() as f64);

        for category in &aggregation.meta.missing {
            *self.missing_counts.entry(category.clone()).or_insert(0) += 1;
        }

        for hit in &aggregation.hits {
            *self
                .win_counts
                .entry(hit.category.clone())
                .or_default()
                .entry(hit.replica.clone())
                .or_insert(0) += 1;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let rate = |n: u64| {
            if self.total_runs > 0 {
                n as f64 / self.total_runs as f64 * 100.0
            } else {
                0.0
            }
        };

        MetricsSummary {
            total_runs: self.total_runs,
            timed_out_runs: self.timed_out_runs,
            partial_runs: self.partial_runs,
            timeout_rate: rate(self.timed_out_runs),
            partial_rate: rate(self.partial_runs),
            latency_ms: StatsSummary::from(&self.latency_stats),
            collected: StatsSummary::from(&self.collected_stats),
            missing_counts: self.missing_counts.clone(),
            win_counts: self.win_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_runs: u64,
    pub timed_out_runs: u64,
    pub partial_runs: u64,
    pub timeout_rate: f64,
    pub partial_rate: f64,
    pub latency_ms: StatsSummary,
    pub collected: StatsSummary,
    pub missing_counts: BTreeMap<String, u64>,
    pub win_counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fan-in Metrics Summary ===")?;
        writeln!(f, "Total runs: {}", self.total_runs)?;
        writeln!(
            f,
            "Timed out: {} ({:.2}%)",
            self.timed_out_runs, self.timeout_rate
        )?;
        writeln!(
            f,
            "Partial: {} ({:.2}%)",
            self.partial_runs, self.partial_rate
        )?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Results per run: {}", self.collected)?;

        if !self.missing_counts.is_empty() {
            writeln!(f, "Missing categories:")?;
            for (category, count) in &self.missing_counts {
                writeln!(f, "  {}: {}", category, count)?;
            }
        }

        if !self.win_counts.is_empty() {
            writeln!(f, "Race winners:")?;
            for (category, replicas) in &self.win_counts {
                let wins: Vec<String> = replicas
                    .iter()
                    .map(|(replica, count)| format!("{replica}={count}"))
                    .collect();
                writeln!(f, "  {}: {}", category, wins.join(", "))?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
