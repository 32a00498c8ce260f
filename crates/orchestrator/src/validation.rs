//! Stage table validation
//!
//! Rules:
//! - stage names unique and non-empty
//! - output keys unique (write-once) and never shadow a session parameter
//! - every required input is a session parameter or an earlier output
//! - templates parse, and every placeholder is a declared required input
//! - stage overrides only name known stages

use std::collections::{BTreeMap, HashSet};

use contracts::{
    SessionParameters, StageDefinition, StageOverride, TemplateError, TutorError, PARAMETER_NAMES,
};

use crate::template::Template;

/// Validate a stage table, returning the first error encountered
pub fn validate_stages(stages: &[StageDefinition]) -> Result<(), TutorError> {
    let mut available: HashSet<&str> = PARAMETER_NAMES.iter().copied().collect();
    let mut names = HashSet::new();
    let mut outputs = HashSet::new();

    for (idx, stage) in stages.iter().enumerate() {
        if stage.name.trim().is_empty() {
            return Err(TutorError::config_validation(
                format!("stages[{idx}].name"),
                "stage name cannot be empty",
            ));
        }
        if !names.insert(stage.name.as_str()) {
            return Err(TutorError::config_validation(
                format!("stages[name={}]", stage.name),
                "duplicate stage name",
            ));
        }
        if SessionParameters::is_parameter(&stage.output_key) {
            return Err(TutorError::config_validation(
                format!("stages[{}].output_key", stage.name),
                format!("output key '{}' shadows a session parameter", stage.output_key),
            ));
        }

        validate_template_bindings(stage)?;

        for input in &stage.required_inputs {
            if !available.contains(input.as_str()) {
                return Err(TutorError::config_validation(
                    format!("stages[{}].required_inputs", stage.name),
                    format!(
                        "'{input}' is neither a session parameter nor the output of an earlier stage"
                    ),
                ));
            }
        }

        if !outputs.insert(stage.output_key.as_str()) {
            return Err(TutorError::duplicate_output(&stage.output_key));
        }
        available.insert(stage.output_key.as_str());
    }

    Ok(())
}

/// Every placeholder in the stage's templates must be a declared input
fn validate_template_bindings(stage: &StageDefinition) -> Result<(), TutorError> {
    let templates = std::iter::once(&stage.template).chain(stage.system_template.as_ref());

    for source in templates {
        let template =
            Template::parse(source).map_err(|e| TutorError::template(&stage.name, e))?;
        if let Some(undeclared) = template
            .placeholders()
            .into_iter()
            .find(|placeholder| !stage.depends_on(placeholder))
        {
            return Err(TutorError::template(
                &stage.name,
                TemplateError::Unbound {
                    placeholder: undeclared.to_string(),
                },
            ));
        }
    }

    Ok(())
}

/// Overrides may only target stages of the table
pub fn validate_overrides(
    stages: &[StageDefinition],
    overrides: &BTreeMap<String, StageOverride>,
) -> Result<(), TutorError> {
    for name in overrides.keys() {
        if !stages.iter().any(|stage| &stage.name == name) {
            return Err(TutorError::config_validation(
                format!("stages.{name}"),
                format!("unknown stage '{name}'"),
            ));
        }
    }
    Ok(())
}
