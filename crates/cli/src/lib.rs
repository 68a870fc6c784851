//! # autointerp-cli
//!
//! Library half of the `autointerp` binary: the composition root that wires
//! a blueprint, a client and a record source into a runnable pipeline, plus
//! the CLI error type. Shared with the integration tests.

pub mod error;
pub mod pipeline;

pub use error::CliError;
pub use pipeline::{build_pipeline, print_summary};
