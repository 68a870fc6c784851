//! Pipeline error types

use contracts::ContractError;
use thiserror::Error;

use crate::report::RunReport;

/// Failure of one stage on one record
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct StageError {
    /// Name of the failing stage
    pub stage: String,
    #[source]
    pub source: ContractError,
}

impl StageError {
    pub fn new(stage: impl Into<String>, source: ContractError) -> Self {
        Self {
            stage: stage.into(),
            source,
        }
    }
}

/// Pipeline-level errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Concurrency ceiling must be at least 1
    #[error("max_concurrency must be at least 1")]
    InvalidConcurrency,

    /// A pipe needs at least one stage
    #[error("pipe has no stages")]
    EmptyPipe,

    /// The run finished but some records failed
    #[error("{} of {} records failed", .report.failures.len(), .report.submitted)]
    RecordsFailed { report: Box<RunReport> },
}

impl PipelineError {
    /// Report of a finished run, if this error carries one
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            Self::RecordsFailed { report } => Some(report),
            _ => None,
        }
    }
}
