//! `run` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::{ApiCredential, ConfigLoader};
use contracts::{SessionParameters, TextGenerator, TutorConfig};
use llm_client::{EchoGenerator, OpenAiClient, OpenAiConfig};
use orchestrator::{Pipeline, PipelineConfig};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{run_session, SessionOptions};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;

    info!(
        topic = %config.session.topic,
        learner = %config.session.name,
        model = %config.backend.model,
        backend = if args.mock { "echo" } else { "openai" },
        "Configuration loaded"
    );

    if args.dry_run {
        // Builds the pipeline so the stage table and overrides get checked too
        Pipeline::new(EchoGenerator::new(), PipelineConfig::from(&config))
            .context("Stage table validation failed")?;
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config, args.mock);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let pipeline_config = PipelineConfig::from(&config);
    let options = SessionOptions {
        transcript: args.output.clone(),
    };

    if args.mock {
        let pipeline = Pipeline::new(EchoGenerator::new(), pipeline_config)
            .context("Failed to build pipeline")?;
        execute(pipeline, config.session, options).await
    } else {
        // Credential is resolved before the first stage; absence is fatal here
        let credential = ApiCredential::from_env(&config.backend.api_key_env)
            .context("No API credential available (use --mock to run offline)")?;
        let client_config = OpenAiConfig::new(&config.backend.base_url, credential.expose());
        let client = OpenAiClient::new(client_config).context("Failed to build HTTP client")?;
        let pipeline =
            Pipeline::new(client, pipeline_config).context("Failed to build pipeline")?;
        execute(pipeline, config.session, options).await
    }
}

/// Load, overlay CLI flags, validate
fn load_config(args: &RunArgs) -> Result<TutorConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => TutorConfig::default(),
    };

    args.session.apply(&mut config.session);

    if let Some(ref model) = args.model {
        info!(model = %model, "Overriding model from CLI");
        config.backend.model = model.clone();
    }
    if let Some(temperature) = args.temperature {
        config.backend.temperature = temperature;
    }
    if let Some(secs) = args.stage_timeout {
        config.backend.stage_timeout_secs = secs;
    }

    ConfigLoader::validate(&config).context("Invalid configuration")?;

    if !config.session.has_known_expertise() {
        warn!(
            expertise = %config.session.course_expertise,
            "Unrecognized expertise level"
        );
    }

    Ok(config)
}

async fn execute<G: TextGenerator + Sync + 'static>(
    pipeline: Pipeline<G>,
    params: SessionParameters,
    options: SessionOptions,
) -> Result<()> {
    let shutdown_signal = setup_shutdown_signal();
    let mut stdout = std::io::stdout();

    tokio::select! {
        result = run_session(&pipeline, params, &options, &mut stdout) => {
            let stats = result.context("Session output failed")?;
            stats.print_summary();

            if let Some(failure) = stats.failure {
                anyhow::bail!(
                    "Pipeline halted at stage {} after {} completed: {}",
                    failure.stage,
                    stats.stages.len(),
                    failure.message
                );
            }
            info!(
                stages = stats.stages.len(),
                duration_secs = stats.duration.as_secs_f64(),
                "Pipeline completed successfully"
            );
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, abandoning run");
        }
    }

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &TutorConfig, mock: bool) {
    println!("\n=== Configuration Summary ===\n");
    println!("Backend:");
    if mock {
        println!("  Mode: echo (offline)");
    } else {
        println!("  Endpoint: {}", config.backend.base_url);
        println!("  Credential: ${}", config.backend.api_key_env);
    }
    println!("  Model: {}", config.backend.model);
    println!("  Temperature: {}", config.backend.temperature);
    if let Some(max_tokens) = config.backend.max_tokens {
        println!("  Max tokens: {}", max_tokens);
    }
    println!(
        "  Stage timeout: {}",
        humanize(Duration::from_secs(config.backend.stage_timeout_secs))
    );

    println!("\nSession:");
    for (name, value) in config.session.iter() {
        println!("  {}: {}", name, value);
    }

    if !config.stages.is_empty() {
        println!("\nStage overrides ({}):", config.stages.len());
        for (stage, stage_override) in &config.stages {
            println!(
                "  - {}: model={} temperature={}",
                stage,
                stage_override.model.as_deref().unwrap_or("-"),
                stage_override
                    .temperature
                    .map_or_else(|| "-".to_string(), |t| t.to_string())
            );
        }
    }

    println!();
}

fn humanize(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
