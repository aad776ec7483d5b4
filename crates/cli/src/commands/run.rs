//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{Aggregation, FanInBlueprint};
use serde::Serialize;
use tracing::{info, warn};

use super::load_blueprint;
use super::signal::shutdown_signal;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Aggregation result for JSON output
#[derive(Serialize)]
struct AggregationOutput {
    query: String,
    requested: usize,
    collected: usize,
    timed_out: bool,
    elapsed_ms: u64,
    hits: Vec<HitOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<String>,
}

#[derive(Serialize)]
struct HitOutput {
    category: String,
    replica: String,
    result: String,
    latency_ms: u64,
}

impl AggregationOutput {
    fn new(query: &str, aggregation: &Aggregation) -> Self {
        Self {
            query: query.to_string(),
            requested: aggregation.meta.requested,
            collected: aggregation.len(),
            timed_out: aggregation.timed_out(),
            elapsed_ms: aggregation.meta.elapsed.as_millis() as u64,
            hits: aggregation
                .hits
                .iter()
                .map(|hit| HitOutput {
                    category: hit.category.clone(),
                    replica: hit.replica.clone(),
                    result: hit.result.to_string(),
                    latency_ms: hit.latency.as_millis() as u64,
                })
                .collect(),
            missing: aggregation.meta.missing.clone(),
        }
    }
}

/// Execute the `run` command
pub async fn run_aggregate(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;

    // Apply CLI overrides
    if let Some(ref query) = args.query {
        info!(query = %query, "Overriding query from CLI");
        blueprint.request.query = query.clone();
    }
    if let Some(deadline_ms) = args.deadline_ms {
        info!(deadline_ms, "Overriding deadline from CLI");
        blueprint.request.deadline_ms = deadline_ms;
    }
    if let Some(policy) = args.straggler_policy {
        blueprint.request.straggler_policy = policy.into();
    }
    config_loader::ConfigLoader::validate(&blueprint).map_err(CliError::from)?;

    info!(
        query = %blueprint.request.query,
        deadline_ms = blueprint.request.deadline_ms,
        policy = ?blueprint.request.straggler_policy,
        categories = blueprint.categories.len(),
        replicas = blueprint.replica_count(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let query = blueprint.request.query.clone();
    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        repeat: args.repeat,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Aggregation failed")?;

            if let Some(ref last) = stats.last {
                if args.json {
                    let json = serde_json::to_string_pretty(&AggregationOutput::new(&query, last))
                        .context("Failed to serialize aggregation")?;
                    println!("{}", json);
                } else {
                    print_aggregation(&query, last);
                }
            }

            if stats.runs > 1 && !args.json {
                stats.print_summary();
            }
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning aggregation");
            return Err(CliError::Interrupted.into());
        }
    }

    Ok(())
}

fn print_aggregation(query: &str, aggregation: &Aggregation) {
    println!("\nResults for {:?}:", query);
    for hit in &aggregation.hits {
        println!(
            "  [{:>5}ms] {:<8} {:<10} {}",
            hit.latency.as_millis(),
            hit.category,
            hit.replica,
            hit.result
        );
    }

    if aggregation.timed_out() {
        println!(
            "\n  timed out after {}ms, missing: {}",
            aggregation.meta.elapsed.as_millis(),
            aggregation.meta.missing.join(", ")
        );
    } else {
        println!(
            "\n  {} of {} categories in {}ms",
            aggregation.len(),
            aggregation.meta.requested,
            aggregation.meta.elapsed.as_millis()
        );
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &FanInBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Request:");
    println!("  Query: {}", blueprint.request.query);
    println!("  Deadline: {}ms", blueprint.request.deadline_ms);
    println!("  Straggler policy: {:?}", blueprint.request.straggler_policy);
    println!("\nCategories ({}):", blueprint.categories.len());
    for category in &blueprint.categories {
        println!(
            "  - {} - {} replicas",
            category.name,
            category.replicas.len()
        );
    }
    println!();
}
