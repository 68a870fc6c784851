//! RunBlueprint - Config Loader output
//!
//! Describes a complete auto-interpretation run: the language-model backend,
//! which cached features to load and how to sample them, the explainer and
//! scorer settings, output directories and the concurrency ceiling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use validator::Validate;

use crate::GenerationOptions;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Language-model backend
    #[validate(nested)]
    pub client: ClientConfig,

    /// Feature cache and selection
    #[validate(nested)]
    pub feature: FeatureConfig,

    /// Train/test sampling
    #[serde(default)]
    #[validate(nested)]
    pub experiment: ExperimentConfig,

    /// Explainer settings
    #[serde(default)]
    #[validate(nested)]
    pub explainer: ExplainerConfig,

    /// Scorer settings
    #[serde(default)]
    #[validate(nested)]
    pub scorer: ScorerConfig,

    /// Artifact directories
    pub output: OutputConfig,

    /// Orchestrator settings
    #[serde(default)]
    #[validate(nested)]
    pub pipeline: PipelineSettings,
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientConfig {
    /// API base URL, e.g. `http://localhost:8000/v1`
    #[serde(default = "default_base_url")]
    #[validate(length(min = 1))]
    pub base_url: String,

    /// Model name sent with every request
    #[validate(length(min = 1))]
    pub model: String,

    /// Environment variable holding the API key (None = no auth header)
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Per-request timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra HTTP headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Which cached features to load
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeatureConfig {
    /// Directory holding the raw activation cache
    pub raw_dir: PathBuf,

    /// Hooked modules to load, in order
    #[validate(length(min = 1))]
    pub modules: Vec<String>,

    /// Feature selection (absent = every cached feature)
    #[serde(default)]
    pub features: Option<FeatureSelection>,

    /// Tokens per example window
    #[serde(default = "default_example_ctx_len")]
    #[validate(range(min = 1))]
    pub example_ctx_len: usize,

    /// Maximum number of pooled windows kept per feature
    #[serde(default = "default_max_examples")]
    #[validate(range(min = 1))]
    pub max_examples: usize,
}

fn default_example_ctx_len() -> usize {
    20
}

fn default_max_examples() -> usize {
    2000
}

/// Feature index selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureSelection {
    /// Half-open range `[start, end)`
    Range { start: u32, end: u32 },
    /// Explicit indices
    Indices(Vec<u32>),
}

impl FeatureSelection {
    pub fn contains(&self, index: u32) -> bool {
        match self {
            Self::Range { start, end } => (*start..*end).contains(&index),
            Self::Indices(indices) => indices.contains(&index),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Range { start, end } => start >= end,
            Self::Indices(indices) => indices.is_empty(),
        }
    }
}

/// How training examples are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainType {
    /// Highest-activating windows
    #[default]
    Top,
    /// Seeded random windows
    Random,
    /// Equal share from every activation band
    Quantiles,
}

/// Train/test sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExperimentConfig {
    /// Examples shown to the explainer
    #[serde(default = "default_n_examples_train")]
    #[validate(range(min = 1))]
    pub n_examples_train: usize,

    /// Test examples per activation band
    #[serde(default = "default_n_examples_test")]
    #[validate(range(min = 1))]
    pub n_examples_test: usize,

    /// Number of activation bands
    #[serde(default = "default_n_quantiles")]
    #[validate(range(min = 1))]
    pub n_quantiles: usize,

    #[serde(default)]
    pub train_type: TrainType,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_examples_train() -> usize {
    20
}

fn default_n_examples_test() -> usize {
    5
}

fn default_n_quantiles() -> usize {
    10
}

fn default_seed() -> u64 {
    22
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_examples_train: default_n_examples_train(),
            n_examples_test: default_n_examples_test(),
            n_quantiles: default_n_quantiles(),
            train_type: TrainType::default(),
            seed: default_seed(),
        }
    }
}

/// Explainer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExplainerConfig {
    #[serde(default)]
    #[validate(nested)]
    pub generation: GenerationOptions,
}

/// Fuzzing scorer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScorerConfig {
    /// Samples per scoring call
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// Keep highlighted sample text in the score
    #[serde(default)]
    pub verbose: bool,

    /// Add wrongly highlighted samples with ground truth 0
    #[serde(default = "default_true")]
    pub include_fuzzed: bool,

    /// Seed for fuzzing and shuffling
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_scorer_generation")]
    #[validate(nested)]
    pub generation: GenerationOptions,
}

fn default_batch_size() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_scorer_generation() -> GenerationOptions {
    GenerationOptions::new(200, 0.0)
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            verbose: false,
            include_fuzzed: true,
            seed: default_seed(),
            generation: default_scorer_generation(),
        }
    }
}

/// Artifact directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub explanation_dir: PathBuf,
    pub score_dir: PathBuf,
}

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineSettings {
    /// Maximum in-flight record traversals
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1))]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    5
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}
