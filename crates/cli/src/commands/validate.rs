//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::TutorConfig;
use orchestrator::{tutor_stages, validate_overrides, validate_stages};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    model: String,
    temperature: f64,
    stage_timeout_secs: u64,
    topic: String,
    stage_count: usize,
    override_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    let loaded = config_loader::ConfigLoader::load_from_path(&args.config).and_then(|config| {
        let stages = tutor_stages();
        validate_stages(&stages)?;
        validate_overrides(&stages, &config.stages)?;
        Ok((config, stages.len()))
    });

    match loaded {
        Ok((config, stage_count)) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    model: config.backend.model.clone(),
                    temperature: config.backend.temperature,
                    stage_timeout_secs: config.backend.stage_timeout_secs,
                    topic: config.session.topic.clone(),
                    stage_count,
                    override_count: config.stages.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &TutorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for (name, value) in config.session.iter() {
        if value.trim().is_empty() {
            warnings.push(format!("session.{} is empty", name));
        }
    }

    if !config.session.course_expertise.trim().is_empty() && !config.session.has_known_expertise()
    {
        warnings.push(format!(
            "session.course_expertise '{}' is not one of {}",
            config.session.course_expertise,
            contracts::EXPERTISE_LEVELS.join(", ")
        ));
    }

    if std::env::var_os(&config.backend.api_key_env).is_none() {
        warnings.push(format!(
            "{} is not set - only `run --mock` will work",
            config.backend.api_key_env
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Model: {}", summary.model);
            println!("  Temperature: {}", summary.temperature);
            println!("  Stage timeout: {}s", summary.stage_timeout_secs);
            println!("  Topic: {}", summary.topic);
            println!("  Stages: {}", summary.stage_count);
            println!("  Stage overrides: {}", summary.override_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
