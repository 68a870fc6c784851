//! # Explainer
//!
//! Turns a record's training examples into a natural-language explanation of
//! the feature.
//!
//! - [`SimpleExplainer`]: few-shot prompt listing each example's activating
//!   tokens with normalized scores

mod prompt;
mod simple;

pub use prompt::{build_messages, EXPLAINER_SYSTEM_PROMPT};
pub use simple::{format_examples, formulate_question, parse_explanation, SimpleExplainer};
