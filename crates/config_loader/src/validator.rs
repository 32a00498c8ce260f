//! Configuration validation
//!
//! Rules:
//! - backend field constraints (model, temperature, base_url, timeout)
//! - per-stage override constraints
//! - override keys are non-empty
//!
//! Stage names in `[stages.*]` are checked against the stage table by the
//! orchestrator, which owns that table.

use contracts::{TutorConfig, TutorError};
use ::validator::{Validate, ValidationErrors};

/// Validate TutorConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &TutorConfig) -> Result<(), TutorError> {
    validate_backend(config)?;
    validate_stage_overrides(config)?;
    Ok(())
}

fn validate_backend(config: &TutorConfig) -> Result<(), TutorError> {
    config
        .backend
        .validate()
        .map_err(|errors| first_violation("backend", &errors))
}

fn validate_stage_overrides(config: &TutorConfig) -> Result<(), TutorError> {
    for (stage, stage_override) in &config.stages {
        if stage.trim().is_empty() {
            return Err(TutorError::config_validation(
                "stages",
                "stage override name cannot be empty",
            ));
        }
        stage_override
            .validate()
            .map_err(|errors| first_violation(&format!("stages.{stage}"), &errors))?;
    }
    Ok(())
}

/// Map validator output to a single error, picking fields alphabetically so
/// the reported error is deterministic.
fn first_violation(section: &str, errors: &ValidationErrors) -> TutorError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, violations)) => {
            let message = violations
                .first()
                .and_then(|v| v.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid value".to_string());
            TutorError::config_validation(format!("{section}.{field}"), message)
        }
        None => TutorError::config_validation(section, errors.to_string()),
    }
}
