//! # Pipeline
//!
//! Asynchronous multi-stage record processing.
//!
//! Responsibilities:
//! - Adapt processing units into stages with preprocess/postprocess hooks
//! - Group stages into pipes (one position, optional fan-out)
//! - Drive records from a lazy loader through the pipes with a concurrency
//!   ceiling, isolating failures per record
//! - Write per-feature artifacts

pub mod error;
pub mod orchestrator;
pub mod pipe;
pub mod report;
pub mod sinks;
pub mod stage;

pub use error::{PipelineError, StageError};
pub use orchestrator::Pipeline;
pub use pipe::{Pipe, PipeOutput};
pub use report::{RecordFailure, RunReport};
pub use sinks::ArtifactWriter;
pub use stage::{PostHook, PreHook, ProcessWrapper, Stage};
