//! # Scorer
//!
//! Scores an explanation by asking a language model whether highlighted
//! token spans match it.
//!
//! - [`FuzzingScorer`]: mixes correctly highlighted test examples with
//!   randomly highlighted ones and measures how often the model tells them apart
//! - [`ResponseSchema`]: the strict `example_1..example_k` verdict schema

mod fuzz;
mod prompts;
mod sample;
mod schema;

pub use fuzz::FuzzingScorer;
pub use prompts::{build_messages, format_batch, SCORER_SYSTEM_PROMPT};
pub use sample::{clean_samples, fuzzed_samples, highlight, Sample};
pub use schema::ResponseSchema;
