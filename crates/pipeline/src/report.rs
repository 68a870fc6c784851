//! RunReport - outcome of one pipeline run

use std::time::Duration;

use contracts::FeatureId;
use observability::{MetricsSummary, RunMetricsAggregator};

/// One record that did not complete every pipe
#[derive(Debug, Clone)]
pub struct RecordFailure {
    /// Failing record (None when the loader could not produce it)
    pub feature: Option<FeatureId>,
    /// Stage that failed (`loader` and `task` for failures outside stages)
    pub stage: String,
    pub error: String,
}

impl std::fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.feature {
            Some(feature) => write!(f, "{feature} [{}]: {}", self.stage, self.error),
            None => write!(f, "<unknown> [{}]: {}", self.stage, self.error),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Loader items pulled (records and loader errors)
    pub submitted: usize,
    /// Records that completed every pipe
    pub completed: usize,
    pub failures: Vec<RecordFailure>,
    pub duration: Duration,
    /// Most record traversals observed in flight at once
    pub peak_in_flight: usize,
    /// Per-stage latency and score statistics
    pub metrics: RunMetricsAggregator,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }
}
