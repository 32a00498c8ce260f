//! Session runner - drives one pipeline run and renders its sections.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{SessionParameters, TextGenerator, TutorError};
use observability::record_pipeline_completed;
use orchestrator::Pipeline;
use tracing::{info, warn};

use super::{RunStats, TranscriptWriter};

/// Session output options
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Markdown transcript path (None = no transcript)
    pub transcript: Option<PathBuf>,
}

/// Run every stage, printing each section to `out` as soon as it arrives
///
/// A stage failure ends the run and is reported through
/// [`RunStats::failure`]; only I/O problems surface as `Err`.
pub async fn run_session<G, W>(
    pipeline: &Pipeline<G>,
    params: SessionParameters,
    options: &SessionOptions,
    out: &mut W,
) -> Result<RunStats>
where
    G: TextGenerator + Sync + 'static,
    W: Write,
{
    let started = Instant::now();
    let mut stats = RunStats::new(pipeline.generator().name(), &pipeline.config().model);

    let mut transcript = options
        .transcript
        .as_deref()
        .map(|path| {
            TranscriptWriter::create(path, &params)
                .with_context(|| format!("Failed to create transcript {}", path.display()))
        })
        .transpose()?;

    let mut run = pipeline.start(params);
    while let Some(result) = run.next_stage().await {
        match result {
            Ok(output) => {
                writeln!(out, "\nSection {}: {}\n", output.index, output.title)?;
                writeln!(out, "{}", output.text.trim_end())?;
                out.flush()?;

                if let Some(writer) = transcript.as_mut() {
                    writer
                        .write_section(&output)
                        .context("Failed to append to transcript")?;
                }
                stats.record(&output);
            }
            Err(err) => {
                let (stage, kind) = failure_origin(&err);
                warn!(stage = %stage, kind, error = %err, "Stage failed");
                stats.record_failure(stage, kind, err.to_string());
            }
        }
    }

    stats.duration = started.elapsed();
    record_pipeline_completed(stats.succeeded(), stats.duration);

    if let Some(writer) = transcript {
        let path = writer
            .finish(&stats)
            .context("Failed to finish transcript")?;
        info!(path = %path.display(), "Transcript written");
    }

    Ok(stats)
}

/// Stage name and error kind for the summary
fn failure_origin(err: &TutorError) -> (String, &'static str) {
    match err {
        TutorError::Generation { stage, source } => (stage.clone(), source.kind()),
        TutorError::Template { stage, .. } => (stage.clone(), "template"),
        TutorError::DuplicateOutput { key } => (key.clone(), "duplicate_output"),
        _ => ("unknown".to_string(), "other"),
    }
}
