//! Pipeline statistics.

use std::time::Duration;

use contracts::Aggregation;
use dispatcher::MetricsSnapshot;
use observability::AggregationStatsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Number of aggregations performed
    pub runs: u32,

    /// Total wall time across all runs
    pub duration: Duration,

    /// Most recent aggregation
    pub last: Option<Aggregation>,

    /// Per-run statistics
    pub aggregations: AggregationStatsAggregator,

    /// Dispatcher counters at the end of the run
    pub dispatcher: MetricsSnapshot,
}

impl PipelineStats {
    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Fan-in Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Runs: {}", self.runs);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Races won: {}", self.dispatcher.races_won);
        println!("   ├─ Races lost: {}", self.dispatcher.races_lost);
        println!("   └─ Late results dropped: {}", self.dispatcher.late_results);

        println!("\n{}", self.aggregations.summary());
    }
}
