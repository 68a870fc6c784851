//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// autointerp - explain and score SAE features with a language model
#[derive(Parser, Debug)]
#[command(
    name = "autointerp",
    author,
    version,
    about = "SAE feature auto-interpretation pipeline",
    long_about = "Generates natural-language explanations of sparse autoencoder features from \n\
                  cached activations and scores them by asking a language model to tell \n\
                  correctly highlighted examples from randomly highlighted ones."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "AUTOINTERP_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "AUTOINTERP_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Explain and score every selected feature
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display the resolved configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "AUTOINTERP_CONFIG")]
    pub config: PathBuf,

    /// Override the in-flight record ceiling from configuration
    #[arg(long, env = "AUTOINTERP_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Override the language-model server base URL
    #[arg(long, env = "AUTOINTERP_BASE_URL")]
    pub base_url: Option<String>,

    /// Override the language-model name
    #[arg(long, env = "AUTOINTERP_MODEL")]
    pub model: Option<String>,

    /// Validate configuration and the activation cache, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "AUTOINTERP_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml", env = "AUTOINTERP_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "AUTOINTERP_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
