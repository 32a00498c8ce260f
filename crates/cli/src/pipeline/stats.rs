//! Run statistics.

use std::time::Duration;

use contracts::StageOutput;
use observability::StageMetricsAggregator;

/// Timing of one completed stage
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub index: usize,
    pub stage: String,
    pub title: String,
    pub elapsed: Duration,
    pub response_chars: usize,
}

/// Stage that ended the run early
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: String,
    pub kind: String,
    pub message: String,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Backend name ("openai", "echo")
    pub backend: String,

    /// Default model of the run
    pub model: String,

    /// Completed stages in order
    pub stages: Vec<StageTiming>,

    /// Wall time of the whole run
    pub duration: Duration,

    /// Set when a stage failed
    pub failure: Option<StageFailure>,

    /// Stage metrics aggregator
    pub metrics: StageMetricsAggregator,
}

impl RunStats {
    pub fn new(backend: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, output: &StageOutput) {
        self.metrics.update(output);
        self.stages.push(StageTiming {
            index: output.index,
            stage: output.stage.clone(),
            title: output.title.clone(),
            elapsed: output.elapsed,
            response_chars: output.text.len(),
        });
    }

    pub fn record_failure(&mut self, stage: impl Into<String>, kind: &str, message: String) {
        self.metrics.record_failure(kind);
        self.failure = Some(StageFailure {
            stage: stage.into(),
            kind: kind.to_string(),
            message,
        });
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Sum of per-stage times (excludes time outside stages)
    pub fn stage_time(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                       Run Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Backend: {} ({})", self.backend, self.model);
        println!("   ├─ Stages completed: {}", self.stages.len());
        println!("   ├─ Stage time: {:.2}s", self.stage_time().as_secs_f64());
        println!("   └─ Total time: {:.2}s", self.duration.as_secs_f64());

        if !self.stages.is_empty() {
            println!("\n⏱  Time Taken");
            let last = self.stages.len() - 1;
            for (i, timing) in self.stages.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!(
                    "   {} {}. {:<14} {:>8.2}s  {:>6} chars",
                    branch,
                    timing.index,
                    timing.title,
                    timing.elapsed.as_secs_f64(),
                    timing.response_chars
                );
            }
        }

        let summary = self.metrics.summary();
        println!("\n📈 Stage Metrics");
        println!("   ├─ Latency (ms): {}", summary.latency_ms);
        println!("   └─ Response length (chars): {}", summary.response_chars);

        if let Some(ref failure) = self.failure {
            println!("\n⚠️  Halted at {} ({})", failure.stage, failure.kind);
            println!("   └─ {}", failure.message);
        }

        println!();
    }
}
