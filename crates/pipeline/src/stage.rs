//! Stage - one step of a record traversal
//!
//! [`ProcessWrapper`] adapts a [`ProcessUnit`] into a stage:
//! `call(record) = postprocess(unit.process(preprocess(record)))`. Errors from
//! any of the three steps are returned unchanged, tagged with the stage name.

use std::time::Instant;

use async_trait::async_trait;
use contracts::{ContractError, FromRecord, IntoRecord, ProcessUnit, Record};
use tracing::{debug, instrument};

use crate::error::StageError;

/// A pipeline stage
///
/// Object safe so that a pipe can hold heterogeneous stages.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name (used in failure reports and metrics)
    fn name(&self) -> &str;

    /// Transform one record
    async fn call(&self, record: Record) -> Result<Record, StageError>;
}

/// Builds a unit input from the incoming record
pub type PreHook<I> = Box<dyn Fn(Record) -> Result<I, ContractError> + Send + Sync>;

/// Folds a unit output back into a record
pub type PostHook<O> = Box<dyn Fn(O) -> Result<Record, ContractError> + Send + Sync>;

/// Processing unit plus its preprocess/postprocess hooks
pub struct ProcessWrapper<U: ProcessUnit> {
    name: String,
    unit: U,
    preprocess: PreHook<U::Input>,
    postprocess: PostHook<U::Output>,
}

impl<U> ProcessWrapper<U>
where
    U: ProcessUnit,
    U::Input: FromRecord + 'static,
    U::Output: IntoRecord + 'static,
{
    /// Wrap `unit` with the default conversions as hooks
    pub fn new(unit: U) -> Self {
        Self::with_hooks(
            unit,
            Box::new(<U::Input as FromRecord>::from_record),
            Box::new(<U::Output as IntoRecord>::into_record),
        )
    }
}

impl<U: ProcessUnit> ProcessWrapper<U> {
    /// Wrap `unit` with explicit hooks
    pub fn with_hooks(unit: U, preprocess: PreHook<U::Input>, postprocess: PostHook<U::Output>) -> Self {
        Self {
            name: unit.name().to_string(),
            unit,
            preprocess,
            postprocess,
        }
    }

    /// Replace the preprocess hook
    pub fn with_preprocess<F>(mut self, preprocess: F) -> Self
    where
        F: Fn(Record) -> Result<U::Input, ContractError> + Send + Sync + 'static,
    {
        self.preprocess = Box::new(preprocess);
        self
    }

    /// Replace the postprocess hook
    pub fn with_postprocess<F>(mut self, postprocess: F) -> Self
    where
        F: Fn(U::Output) -> Result<Record, ContractError> + Send + Sync + 'static,
    {
        self.postprocess = Box::new(postprocess);
        self
    }

    /// Override the stage name (defaults to the unit name)
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }
}

#[async_trait]
impl<U> Stage for ProcessWrapper<U>
where
    U: ProcessUnit + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "stage_call",
        skip(self, record),
        fields(stage = %self.name, feature = %record.feature())
    )]
    async fn call(&self, record: Record) -> Result<Record, StageError> {
        let start = Instant::now();

        let input = (self.preprocess)(record).map_err(|e| StageError::new(&self.name, e))?;
        let output = self
            .unit
            .process(input)
            .await
            .map_err(|e| StageError::new(&self.name, e))?;
        let record = (self.postprocess)(output).map_err(|e| StageError::new(&self.name, e))?;

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        observability::record_stage_latency_ms(&self.name, latency_ms);
        debug!(latency_ms, "Stage finished");
        Ok(record)
    }
}
