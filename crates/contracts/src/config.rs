//! TutorConfig - Config Loader output
//!
//! Backend settings, default session profile and per-stage overrides.

use std::collections::BTreeMap;

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::SessionParameters;

pub const DEFAULT_MODEL: &str = "gpt-4-1106-preview";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete tutor configuration
///
/// Every section has defaults, an empty document is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Text-generation backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Default session parameters (CLI flags take precedence)
    #[serde(default)]
    pub session: SessionParameters,

    /// Per-stage overrides keyed by stage name
    #[serde(default)]
    pub stages: BTreeMap<String, StageOverride>,
}

/// Backend settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BackendConfig {
    /// Default model identifier
    #[serde(default = "default_model")]
    #[validate(length(min = 1, message = "model cannot be empty"))]
    pub model: String,

    /// Default sampling temperature
    #[serde(default = "default_temperature")]
    #[validate(
        range(min = 0.0, max = 2.0, message = "temperature must be within 0.0..=2.0"),
        custom(function = "finite_temperature")
    )]
    pub temperature: f64,

    /// Completion token limit
    #[serde(default)]
    #[validate(range(min = 1, message = "max_tokens must be > 0"))]
    pub max_tokens: Option<u32>,

    /// Chat-completions API base URL
    #[serde(default = "default_base_url")]
    #[validate(url(message = "base_url must be a valid URL"))]
    pub base_url: String,

    /// Environment variable holding the API credential
    #[serde(default = "default_api_key_env")]
    #[validate(length(min = 1, message = "api_key_env cannot be empty"))]
    pub api_key_env: String,

    /// Per-stage timeout in seconds
    #[serde(default = "default_stage_timeout_secs")]
    #[validate(range(min = 1, message = "stage_timeout_secs must be > 0"))]
    pub stage_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_stage_timeout_secs() -> u64 {
    DEFAULT_STAGE_TIMEOUT_SECS
}

/// Range checks pass NaN, so reject non-finite values explicitly
fn finite_temperature(temperature: f64) -> Result<(), ValidationError> {
    if temperature.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new("finite")
            .with_message(Cow::Borrowed("temperature must be a finite number")))
    }
}

/// Per-stage backend overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct StageOverride {
    /// Model identifier for this stage only
    #[serde(default)]
    #[validate(length(min = 1, message = "model cannot be empty"))]
    pub model: Option<String>,

    /// Sampling temperature for this stage only
    #[serde(default)]
    #[validate(
        range(min = 0.0, max = 2.0, message = "temperature must be within 0.0..=2.0"),
        custom(function = "finite_temperature")
    )]
    pub temperature: Option<f64>,

    /// Completion token limit for this stage only
    #[serde(default)]
    #[validate(range(min = 1, message = "max_tokens must be > 0"))]
    pub max_tokens: Option<u32>,
}
