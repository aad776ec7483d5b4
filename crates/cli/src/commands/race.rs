//! `race` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use super::load_blueprint;
use super::signal::shutdown_signal;
use crate::cli::RaceArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

#[derive(Serialize)]
struct RaceOutput {
    category: String,
    replica: String,
    result: String,
    latency_ms: u64,
}

/// Execute the `race` command
pub async fn run_race(args: &RaceArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.config)?;
    if let Some(ref query) = args.query {
        blueprint.request.query = query.clone();
        config_loader::ConfigLoader::validate(&blueprint).map_err(CliError::from)?;
    }

    info!(
        category = %args.category,
        query = %blueprint.request.query,
        "Racing category"
    );

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        repeat: 1,
        metrics_port: None,
    });

    let outcome = tokio::select! {
        outcome = pipeline.race(&args.category) => outcome?,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning race");
            return Err(CliError::Interrupted.into());
        }
    };

    if args.json {
        let output = RaceOutput {
            category: args.category.clone(),
            replica: outcome.replica.clone(),
            result: outcome.result.to_string(),
            latency_ms: outcome.latency.as_millis() as u64,
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize outcome")?;
        println!("{}", json);
    } else {
        println!(
            "{} won by {} in {}ms: {}",
            args.category,
            outcome.replica,
            outcome.latency.as_millis(),
            outcome.result
        );
    }

    Ok(())
}
