//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{FeatureSelection, RunBlueprint};
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&blueprint)
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn describe_selection(selection: Option<&FeatureSelection>) -> String {
    match selection {
        None => "all cached features".to_string(),
        Some(FeatureSelection::Range { start, end }) => format!("{start}..{end}"),
        Some(FeatureSelection::Indices(indices)) => format!("{indices:?}"),
    }
}

fn print_config_info(blueprint: &RunBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               autointerp Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let client = &blueprint.client;
    println!("🤖 Client");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Model: {}", client.model);
    println!("   ├─ Base URL: {}", client.base_url);
    match &client.api_key_env {
        Some(env) => println!("   ├─ API key env: {}", env),
        None => println!("   ├─ API key env: (none)"),
    }
    if client.timeout_secs == 0 {
        println!("   └─ Timeout: none");
    } else {
        println!("   └─ Timeout: {}s", client.timeout_secs);
    }

    let feature = &blueprint.feature;
    println!("\n🧠 Features ({})", feature.modules.len());
    println!("   ├─ Cache: {}", feature.raw_dir.display());
    for module in &feature.modules {
        println!("   ├─ Module: {}", module);
    }
    println!(
        "   ├─ Selection: {}",
        describe_selection(feature.features.as_ref())
    );
    println!("   ├─ Context length: {}", feature.example_ctx_len);
    println!("   └─ Max examples: {}", feature.max_examples);

    let experiment = &blueprint.experiment;
    println!("\n🎲 Sampling");
    println!(
        "   ├─ Train: {} ({:?})",
        experiment.n_examples_train, experiment.train_type
    );
    println!(
        "   ├─ Test: {} per band, {} bands",
        experiment.n_examples_test, experiment.n_quantiles
    );
    println!("   └─ Seed: {}", experiment.seed);

    let scorer = &blueprint.scorer;
    println!("\n⚖️  Scorer");
    println!("   ├─ Batch size: {}", scorer.batch_size);
    println!("   ├─ Include fuzzed: {}", scorer.include_fuzzed);
    println!("   └─ Verbose: {}", scorer.verbose);

    println!("\n📤 Output");
    println!("   ├─ Explanations: {}", blueprint.output.explanation_dir.display());
    println!("   ├─ Scores: {}", blueprint.output.score_dir.display());
    println!("   └─ Max concurrency: {}", blueprint.pipeline.max_concurrency);

    println!();
}
