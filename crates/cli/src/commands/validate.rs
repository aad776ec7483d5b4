//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DelayProfile, FanInBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    query: String,
    deadline_ms: u64,
    category_count: usize,
    replica_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    query: blueprint.request.query.clone(),
                    deadline_ms: blueprint.request.deadline_ms,
                    category_count: blueprint.categories.len(),
                    replica_count: blueprint.replica_count(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &FanInBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let deadline_ms = blueprint.request.deadline_ms;

    if deadline_ms == 0 {
        warnings.push("deadline_ms is 0 - every aggregation will return no results".to_string());
    }

    for category in &blueprint.categories {
        let fastest = category
            .replicas
            .iter()
            .filter_map(|r| match r.delay {
                DelayProfile::Fixed { ms } => Some(ms),
                DelayProfile::Uniform { min_ms, .. } => Some(min_ms),
                DelayProfile::Never => None,
            })
            .min();

        match fastest {
            None => warnings.push(format!(
                "Category '{}' has no replica that ever answers",
                category.name
            )),
            Some(ms) if ms >= deadline_ms && deadline_ms > 0 => warnings.push(format!(
                "Category '{}' cannot answer before the {}ms deadline (fastest replica: {}ms)",
                category.name, deadline_ms, ms
            )),
            Some(_) => {}
        }

        if category.replicas.len() == 1 {
            warnings.push(format!(
                "Category '{}' has a single replica - nothing to race",
                category.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Query: {}", summary.query);
            println!("  Deadline: {}ms", summary.deadline_ms);
            println!("  Categories: {}", summary.category_count);
            println!("  Replicas: {}", summary.replica_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config(
            r#"
[request]
query = "golang"
deadline_ms = 50

[[categories]]
name = "web"
[[categories.replicas]]
name = "web1"
delay = { kind = "fixed", ms = 10 }
[[categories.replicas]]
name = "web2"
delay = { kind = "fixed", ms = 20 }

[[categories]]
name = "video"
[[categories.replicas]]
name = "video1"
delay = { kind = "never" }
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("'video' has no replica")));
        assert!(warnings.iter().any(|w| w.contains("single replica")));
        assert_eq!(result.summary.unwrap().replica_count, 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = ValidateArgs {
            config: dir.path().join("absent.toml"),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_invalid_config() {
        let file = write_config(
            r#"
[request]
query = ""
deadline_ms = 50

[[categories]]
name = "web"
[[categories.replicas]]
name = "web1"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("query cannot be empty"));
    }
}
