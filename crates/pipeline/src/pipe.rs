//! Pipe - the stages at one pipeline position
//!
//! A pipe with one stage passes the record through it. A pipe with several
//! stages runs them concurrently on clones of the same record; the results
//! come back in declared order and are merged before the next pipe.

use std::time::Instant;

use contracts::Record;
use futures::future::join_all;
use observability::RunMetricsAggregator;
use tracing::debug;

use crate::error::{PipelineError, StageError};
use crate::stage::Stage;

/// Stage name used for fan-out merge failures
pub const MERGE_STAGE: &str = "merge";

/// Output of one pipe
#[derive(Debug)]
pub enum PipeOutput {
    Single(Record),
    /// One record per stage, in declared order
    Fanout(Vec<Record>),
}

impl PipeOutput {
    /// Collapse to one record, merging fan-out branches
    pub fn into_record(self) -> Result<Record, StageError> {
        match self {
            Self::Single(record) => Ok(record),
            Self::Fanout(records) => {
                let mut records = records.into_iter();
                let first = records
                    .next()
                    .ok_or_else(|| StageError::new(MERGE_STAGE, contracts::ContractError::Other("empty fan-out".into())))?;
                records.try_fold(first, |acc, next| {
                    acc.merge(next).map_err(|e| StageError::new(MERGE_STAGE, e))
                })
            }
        }
    }
}

/// One pipeline position
pub struct Pipe {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipe {
    /// Pipe with a single stage
    pub fn new(stage: impl Stage + 'static) -> Self {
        Self {
            stages: vec![Box::new(stage)],
        }
    }

    /// Pipe running several stages on the same input
    pub fn fanout(stages: Vec<Box<dyn Stage>>) -> Result<Self, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::EmptyPipe);
        }
        Ok(Self { stages })
    }

    /// Add another stage to this pipe
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage of the pipe on `record`
    ///
    /// Stage latencies are added to `metrics`. With several stages, all of
    /// them run to completion; the first failure in declared order is returned.
    pub async fn run(
        &self,
        record: Record,
        metrics: &mut RunMetricsAggregator,
    ) -> Result<PipeOutput, StageError> {
        if let [stage] = self.stages.as_slice() {
            let start = Instant::now();
            let result = stage.call(record).await;
            metrics.record_stage(stage.name(), elapsed_ms(start));
            return result.map(PipeOutput::Single);
        }

        let mut branches = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let record = record.clone();
            branches.push(async move {
                let start = Instant::now();
                let result = stage.call(record).await;
                (stage.name(), elapsed_ms(start), result)
            });
        }

        let mut records = Vec::with_capacity(self.stages.len());
        let mut first_error = None;
        for (name, latency_ms, result) in join_all(branches).await {
            metrics.record_stage(name, latency_ms);
            match result {
                Ok(record) => records.push(record),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => debug!(stage = name, error = %e, "Additional fan-out failure"),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(PipeOutput::Fanout(records)),
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
