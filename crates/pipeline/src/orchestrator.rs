//! Pipeline - drives records from a lazy loader through ordered pipes
//!
//! Each record traversal runs as its own task. A counting semaphore bounds
//! the number of traversals in flight; a permit is taken before the loader is
//! asked for the next item, so the loader is never read ahead of capacity.
//! Records leave the pipeline in whatever order they finish.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use contracts::{FeatureId, Record};
use observability::RunMetricsAggregator;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info, instrument};

use crate::error::{PipelineError, StageError};
use crate::pipe::Pipe;
use crate::report::{RecordFailure, RunReport};

/// Stage name for items the loader failed to produce
pub const LOADER_STAGE: &str = "loader";

/// Stage name for traversals that panicked
pub const TASK_STAGE: &str = "task";

type TraversalOutput = (Result<(), StageError>, RunMetricsAggregator);

/// Ordered pipes fed by a loader
pub struct Pipeline<L> {
    loader: L,
    pipes: Vec<Pipe>,
}

impl<L, E> Pipeline<L>
where
    L: Iterator<Item = Result<Record, E>>,
    E: Display,
{
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            pipes: Vec::new(),
        }
    }

    /// Append a pipe; records visit pipes in the order they were added
    pub fn with_pipe(mut self, pipe: Pipe) -> Self {
        self.pipes.push(pipe);
        self
    }

    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    /// Run every loader item through the pipes
    ///
    /// Returns once every submitted traversal has finished. A failing record
    /// never stops the others; when any record failed the report comes back
    /// inside [`PipelineError::RecordsFailed`].
    #[instrument(name = "pipeline_run", skip(self), fields(pipes = self.pipes.len()))]
    pub async fn run(self, max_concurrency: usize) -> Result<RunReport, PipelineError> {
        if max_concurrency == 0 {
            return Err(PipelineError::InvalidConcurrency);
        }

        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let pipes = Arc::new(self.pipes);
        let mut loader = self.loader;
        let mut tasks: JoinSet<TraversalOutput> = JoinSet::new();
        let mut in_flight: HashMap<task::Id, FeatureId> = HashMap::new();
        let mut report = RunReport::default();

        info!(max_concurrency, "Pipeline started");

        loop {
            while let Some(joined) = tasks.try_join_next_with_id() {
                settle(&mut report, &mut in_flight, joined);
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let Some(item) = loader.next() else {
                break;
            };
            report.submitted += 1;

            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    fail(&mut report, None, LOADER_STAGE, e.to_string());
                    continue;
                }
            };

            let feature = record.feature().clone();
            debug!(feature = %feature, "Record submitted");
            let pipes = Arc::clone(&pipes);
            let handle = tasks.spawn(async move {
                let _permit = permit;
                traverse(&pipes, record).await
            });
            in_flight.insert(handle.id(), feature);

            let active = max_concurrency - semaphore.available_permits();
            report.peak_in_flight = report.peak_in_flight.max(active);
            observability::record_in_flight(active);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            settle(&mut report, &mut in_flight, joined);
        }
        observability::record_in_flight(0);

        report.duration = start.elapsed();
        info!(
            submitted = report.submitted,
            completed = report.completed,
            failed = report.failed(),
            duration_ms = report.duration.as_millis() as u64,
            "Pipeline finished"
        );

        if report.is_success() {
            Ok(report)
        } else {
            Err(PipelineError::RecordsFailed {
                report: Box::new(report),
            })
        }
    }
}

/// One record through every pipe, in order
async fn traverse(pipes: &[Pipe], mut record: Record) -> TraversalOutput {
    let mut metrics = RunMetricsAggregator::new();
    for pipe in pipes {
        let output = pipe.run(record, &mut metrics).await;
        record = match output.and_then(|out| out.into_record()) {
            Ok(record) => record,
            Err(e) => return (Err(e), metrics),
        };
    }

    for score in record.scores().values() {
        metrics.record_accuracy(score.accuracy);
    }
    (Ok(()), metrics)
}

fn settle(
    report: &mut RunReport,
    in_flight: &mut HashMap<task::Id, FeatureId>,
    joined: Result<(task::Id, TraversalOutput), JoinError>,
) {
    match joined {
        Ok((id, (result, metrics))) => {
            let feature = in_flight.remove(&id);
            report.metrics.merge(&metrics);
            match result {
                Ok(()) => {
                    report.completed += 1;
                    report.metrics.record_outcome(true);
                    observability::record_record_completed(true);
                }
                Err(e) => fail(report, feature, &e.stage, e.source.to_string()),
            }
        }
        Err(join_err) => {
            let feature = in_flight.remove(&join_err.id());
            fail(report, feature, TASK_STAGE, join_err.to_string());
        }
    }
}

fn fail(report: &mut RunReport, feature: Option<FeatureId>, stage: &str, error: String) {
    match &feature {
        Some(feature) => error!(feature = %feature, stage, error = %error, "Record failed"),
        None => error!(stage, error = %error, "Record failed"),
    }
    report.metrics.record_outcome(false);
    observability::record_record_completed(false);
    report.failures.push(RecordFailure {
        feature,
        stage: stage.to_string(),
        error,
    });
}
