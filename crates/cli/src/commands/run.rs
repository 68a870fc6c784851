//! `run` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use autointerp_cli::{build_pipeline, print_summary, CliError};
use clients::OpenAiCompatClient;
use config_loader::ConfigLoader;
use contracts::RunBlueprint;
use loader::FeatureDataset;
use pipeline::PipelineError;
use tracing::{info, warn};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    ConfigLoader::validate(&blueprint).context("Configuration invalid after CLI overrides")?;

    info!(
        model = %blueprint.client.model,
        base_url = %blueprint.client.base_url,
        modules = blueprint.feature.modules.len(),
        max_concurrency = blueprint.pipeline.max_concurrency,
        "Configuration loaded"
    );

    let dataset = FeatureDataset::open(&blueprint.feature, &blueprint.experiment)
        .with_context(|| {
            format!(
                "Failed to open activation cache at {}",
                blueprint.feature.raw_dir.display()
            )
        })?;

    if args.dry_run {
        info!("Dry run mode - configuration and cache are readable, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let client = Arc::new(
        OpenAiCompatClient::from_config(&blueprint.client)
            .context("Failed to create language-model client")?,
    );
    let pipeline = build_pipeline(&blueprint, client, dataset.records())?;
    let max_concurrency = blueprint.pipeline.max_concurrency;

    let shutdown_signal = setup_shutdown_signal();

    info!("Starting pipeline...");

    tokio::select! {
        result = pipeline.run(max_concurrency) => {
            match result {
                Ok(report) => {
                    info!(
                        completed = report.completed,
                        duration_secs = report.duration.as_secs_f64(),
                        "Pipeline completed successfully"
                    );
                    print_summary(&report);
                }
                Err(PipelineError::RecordsFailed { report }) => {
                    print_summary(&report);
                    return Err(CliError::RecordsFailed {
                        failed: report.failed(),
                        submitted: report.submitted,
                    }
                    .into());
                }
                Err(e) => {
                    return Err(e).context("Pipeline execution failed");
                }
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping pipeline...");
        }
    }

    info!("autointerp finished");
    Ok(())
}

fn apply_overrides(blueprint: &mut RunBlueprint, args: &RunArgs) {
    if let Some(max_concurrency) = args.max_concurrency {
        info!(max_concurrency, "Overriding max_concurrency from CLI");
        blueprint.pipeline.max_concurrency = max_concurrency;
    }
    if let Some(ref base_url) = args.base_url {
        info!(base_url = %base_url, "Overriding client base_url from CLI");
        blueprint.client.base_url = base_url.clone();
    }
    if let Some(ref model) = args.model {
        info!(model = %model, "Overriding client model from CLI");
        blueprint.client.model = model.clone();
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RunBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Client:");
    println!("  Model: {}", blueprint.client.model);
    println!("  Base URL: {}", blueprint.client.base_url);
    println!("\nFeatures:");
    println!("  Cache: {}", blueprint.feature.raw_dir.display());
    println!("  Modules: {}", blueprint.feature.modules.join(", "));
    match &blueprint.feature.features {
        Some(selection) => println!("  Selection: {:?}", selection),
        None => println!("  Selection: all"),
    }
    println!("\nPipeline:");
    println!("  Max concurrency: {}", blueprint.pipeline.max_concurrency);
    println!("  Explanations: {}", blueprint.output.explanation_dir.display());
    println!("  Scores: {}", blueprint.output.score_dir.display());
    println!();
}
