//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DelayProfile, FanInBlueprint};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    request: RequestInfo,
    categories: Vec<CategoryInfo>,
}

#[derive(Serialize)]
struct RequestInfo {
    query: String,
    deadline_ms: u64,
    straggler_policy: String,
}

#[derive(Serialize)]
struct CategoryInfo {
    name: String,
    replica_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    replicas: Vec<ReplicaInfo>,
}

#[derive(Serialize)]
struct ReplicaInfo {
    name: String,
    delay: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn describe_delay(delay: &DelayProfile) -> String {
    match delay {
        DelayProfile::Fixed { ms } => format!("{ms}ms"),
        DelayProfile::Uniform { min_ms, max_ms } => format!("{min_ms}-{max_ms}ms"),
        DelayProfile::Never => "never answers".to_string(),
    }
}

fn build_config_info(blueprint: &FanInBlueprint, args: &InfoArgs) -> ConfigInfo {
    let categories = blueprint
        .categories
        .iter()
        .map(|c| CategoryInfo {
            name: c.name.clone(),
            replica_count: c.replicas.len(),
            replicas: if args.replicas {
                c.replicas
                    .iter()
                    .map(|r| ReplicaInfo {
                        name: r.name.clone(),
                        delay: describe_delay(&r.delay),
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        request: RequestInfo {
            query: blueprint.request.query.clone(),
            deadline_ms: blueprint.request.deadline_ms,
            straggler_policy: format!("{:?}", blueprint.request.straggler_policy),
        },
        categories,
    }
}

fn print_config_info(blueprint: &FanInBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Fan-in Configuration                         ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🔎 Request");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Query: {}", blueprint.request.query);
    println!("   ├─ Deadline: {}ms", blueprint.request.deadline_ms);
    println!(
        "   └─ Straggler policy: {:?}",
        blueprint.request.straggler_policy
    );

    println!("\n📂 Categories ({})", blueprint.categories.len());
    for (i, category) in blueprint.categories.iter().enumerate() {
        let is_last = i == blueprint.categories.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {}", prefix, category.name);

        if args.replicas {
            for (j, replica) in category.replicas.iter().enumerate() {
                let replica_prefix = if j == category.replicas.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!(
                    "   {}  {} {} ({})",
                    child_prefix,
                    replica_prefix,
                    replica.name,
                    describe_delay(&replica.delay)
                );
            }
        } else {
            println!(
                "   {}  └─ {} replicas",
                child_prefix,
                category.replicas.len()
            );
        }
    }

    println!();
}
