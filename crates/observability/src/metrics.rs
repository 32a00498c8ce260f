//! Pipeline metrics
//!
//! Prometheus counters/histograms for stage execution, plus an in-memory
//! aggregator for end-of-run summaries.

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::StageOutput;
use metrics::{counter, histogram};

/// Record a successfully completed stage
pub fn record_stage_completed(
    stage: &str,
    elapsed: Duration,
    prompt_chars: usize,
    response_chars: usize,
) {
    counter!("tutor_chain_stages_completed_total", "stage" => stage.to_string()).increment(1);

    histogram!("tutor_chain_stage_latency_ms", "stage" => stage.to_string())
        .record(elapsed.as_secs_f64() * 1000.0);

    histogram!("tutor_chain_prompt_chars", "stage" => stage.to_string())
        .record(prompt_chars as f64);

    histogram!("tutor_chain_response_chars", "stage" => stage.to_string())
        .record(response_chars as f64);
}

/// Record a backend failure
pub fn record_generation_error(stage: &str, kind: &str) {
    counter!(
        "tutor_chain_generation_errors_total",
        "stage" => stage.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record the end of a run
pub fn record_pipeline_completed(success: bool, elapsed: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("tutor_chain_runs_total", "status" => status.to_string()).increment(1);
    histogram!("tutor_chain_run_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}

/// Stage metrics aggregator
///
/// Aggregates in memory for the summary printed after a run.
#[derive(Debug, Clone, Default)]
pub struct StageMetricsAggregator {
    /// Stages completed
    pub stages_completed: u64,

    /// Backend failures
    pub failures: u64,

    /// Stage latency (ms) across all stages
    pub latency_stats: RunningStats,

    /// Response length (chars) across all stages
    pub response_stats: RunningStats,

    /// Latency (ms) per stage name
    pub stage_latency: BTreeMap<String, f64>,

    /// Failure counts per error kind
    pub failure_kinds: BTreeMap<String, u64>,
}

impl StageMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, output: &StageOutput) {
        let latency_ms = output.elapsed.as_secs_f64() * 1000.0;

        self.stages_completed += 1;
        self.latency_stats.push(latency_ms);
        self.response_stats.push(output.text.len() as f64);
        self.stage_latency.insert(output.stage.clone(), latency_ms);
    }

    pub fn record_failure(&mut self, kind: &str) {
        self.failures += 1;
        *self.failure_kinds.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            stages_completed: self.stages_completed,
            failures: self.failures,
            total_latency_ms: self.stage_latency.values().sum(),
            latency_ms: StatsSummary::from(&self.latency_stats),
            response_chars: StatsSummary::from(&self.response_stats),
            failure_kinds: self.failure_kinds.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub stages_completed: u64,
    pub failures: u64,
    pub total_latency_ms: f64,
    pub latency_ms: StatsSummary,
    pub response_chars: StatsSummary,
    pub failure_kinds: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Stage Metrics Summary ===")?;
        writeln!(f, "Stages completed: {}", self.stages_completed)?;
        writeln!(f, "Failures: {}", self.failures)?;
        writeln!(f, "Total stage time: {:.1} ms", self.total_latency_ms)?;
        writeln!(f, "Stage latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Response length (chars): {}", self.response_chars)?;

        if !self.failure_kinds.is_empty() {
            writeln!(f, "Failure kinds:")?;
            for (kind, count) in &self.failure_kinds {
                writeln!(f, "  {}: {}", kind, count)?;
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
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
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
