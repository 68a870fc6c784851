//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RunBlueprint, TrainType};
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
    model: String,
    module_count: usize,
    max_concurrency: usize,
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
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    model: blueprint.client.model.clone(),
                    module_count: blueprint.feature.modules.len(),
                    max_concurrency: blueprint.pipeline.max_concurrency,
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
fn collect_warnings(blueprint: &RunBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.feature.raw_dir.exists() {
        warnings.push(format!(
            "feature.raw_dir {} does not exist",
            blueprint.feature.raw_dir.display()
        ));
    }

    if blueprint.feature.features.is_none() {
        warnings.push("feature.features not set - every cached feature will be processed".to_string());
    }

    if let Some(ref env) = blueprint.client.api_key_env {
        if std::env::var(env).is_err() {
            warnings.push(format!("client.api_key_env '{}' is not set in the environment", env));
        }
    }

    if !blueprint.scorer.include_fuzzed {
        warnings.push(
            "scorer.include_fuzzed is false - every sample has ground truth 1".to_string(),
        );
    }

    let experiment = &blueprint.experiment;
    if experiment.train_type == TrainType::Quantiles
        && experiment.n_examples_train < experiment.n_quantiles
    {
        warnings.push(format!(
            "n_examples_train ({}) < n_quantiles ({}) - some quantiles contribute no train examples",
            experiment.n_examples_train, experiment.n_quantiles
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Model: {}", summary.model);
            println!("  Modules: {}", summary.module_count);
            println!("  Max concurrency: {}", summary.max_concurrency);
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
