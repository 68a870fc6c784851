//! # Loader
//!
//! Feature record loading from a cached activation corpus.
//!
//! Responsibilities:
//! - Read the token corpus and per-module sparse activations
//! - Pool the top activating windows of every selected feature
//! - Sample train examples and banded test examples
//! - Produce records lazily, one feature at a time
//!
//! ## Usage
//!
//! ```ignore
//! use loader::FeatureDataset;
//!
//! let dataset = FeatureDataset::open(&blueprint.feature, &blueprint.experiment)?;
//! for item in dataset.records() {
//!     let record = item?;
//!     println!("{}: {} examples", record.feature(), record.examples.len());
//! }
//! ```

mod cache;
mod dataset;
mod error;
mod sampler;
mod windows;

pub use cache::{activations_path, module_dir_name, Hit, ModuleActivations, TokenCache};
pub use dataset::{FeatureDataset, FeatureRecords};
pub use error::{LoaderError, Result};
pub use sampler::Sampler;
pub use windows::pool_max_activation_windows;
