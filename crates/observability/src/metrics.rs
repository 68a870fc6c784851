//! Run metrics
//!
//! Prometheus counters/histograms for record traversals, stage latency and
//! language-model calls, plus an in-memory aggregator for the end-of-run summary.

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// Record one finished record traversal
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_record_completed;
///
/// record_record_completed(report.is_ok());
/// ```
pub fn record_record_completed(success: bool) {
    let status = if success { "ok" } else { "failed" };
    counter!("autointerp_records_total", "status" => status).increment(1);
}

/// Record the latency of one stage call
pub fn record_stage_latency_ms(stage: &str, latency_ms: f64) {
    histogram!(
        "autointerp_stage_latency_ms",
        "stage" => stage.to_string()
    )
    .record(latency_ms);
}

/// Record one language-model request
pub fn record_client_request(client: &str, success: bool, latency_ms: f64) {
    let status = if success { "ok" } else { "error" };
    counter!(
        "autointerp_client_requests_total",
        "client" => client.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("autointerp_client_latency_ms").record(latency_ms);
}

/// Record the number of record traversals currently in flight
pub fn record_in_flight(in_flight: usize) {
    gauge!("autointerp_in_flight_records").set(in_flight as f64);
}

/// Record a scorer accuracy
pub fn record_accuracy(scorer: &str, accuracy: f64) {
    histogram!(
        "autointerp_score_accuracy",
        "scorer" => scorer.to_string()
    )
    .record(accuracy);
}

/// Run metrics aggregator
///
/// Aggregates in memory so a summary can be printed when the run ends.
#[derive(Debug, Clone, Default)]
pub struct RunMetricsAggregator {
    /// Records that finished every pipe
    pub succeeded: u64,

    /// Records that failed in some stage
    pub failed: u64,

    /// Per-stage latency (ms)
    pub stage_latency_ms: BTreeMap<String, RunningStats>,

    /// Scorer accuracies
    pub accuracy: RunningStats,
}

impl RunMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&mut self, success: bool) {
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn record_stage(&mut self, stage: &str, latency_ms: f64) {
        self.stage_latency_ms
            .entry(stage.to_string())
            .or_default()
            .push(latency_ms);
    }

    pub fn record_accuracy(&mut self, accuracy: f64) {
        self.accuracy.push(accuracy);
    }

    /// Merge another aggregator into this one
    pub fn merge(&mut self, other: &RunMetricsAggregator) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        for (stage, stats) in &other.stage_latency_ms {
            self.stage_latency_ms
                .entry(stage.clone())
                .or_default()
                .merge(stats);
        }
        self.accuracy.merge(&other.accuracy);
    }

    /// Produce the summary report
    pub fn summary(&self) -> MetricsSummary {
        let total = self.succeeded + self.failed;
        MetricsSummary {
            total_records: total,
            succeeded: self.succeeded,
            failed: self.failed,
            failure_rate: if total > 0 {
                self.failed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            stage_latency_ms: self
                .stage_latency_ms
                .iter()
                .map(|(stage, stats)| (stage.clone(), StatsSummary::from(stats)))
                .collect(),
            accuracy: StatsSummary::from(&self.accuracy),
        }
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_records: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub failure_rate: f64,
    pub stage_latency_ms: BTreeMap<String, StatsSummary>,
    pub accuracy: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Run Metrics Summary ===")?;
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "Succeeded: {}", self.succeeded)?;
        writeln!(f, "Failed: {} ({:.2}%)", self.failed, self.failure_rate)?;
        writeln!(f, "Accuracy: {}", self.accuracy)?;

        if !self.stage_latency_ms.is_empty() {
            writeln!(f, "Stage latency (ms):")?;
            for (stage, stats) in &self.stage_latency_ms {
                writeln!(f, "  {}: {}", stage, stats)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Combine with another set of samples (Chan et al. parallel update)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / count as f64;
        self.m2 += other.m2 + delta * delta * (self.count * other.count) as f64 / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
