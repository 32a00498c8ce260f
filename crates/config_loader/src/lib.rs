//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `TutorConfig`
//! - Load the backend credential from the environment
//!
//! # Example
//!
//! ```no_run
//! use config_loader::{ApiCredential, ConfigLoader};
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("tutor.toml")).unwrap();
//! let credential = ApiCredential::from_env(&config.backend.api_key_env).unwrap();
//! println!("Model: {}", config.backend.model);
//! ```

mod credentials;
mod parser;
mod validator;

pub use contracts::TutorConfig;
pub use credentials::ApiCredential;
pub use parser::ConfigFormat;

use contracts::TutorError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<TutorConfig, TutorError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        tracing::debug!(path = %path.display(), ?format, "Parsing configuration");
        Self::load_from_str(&content, format)
    }

    /// Load from `path` when given, otherwise validated defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<TutorConfig, TutorError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let config = TutorConfig::default();
                validator::validate(&config)?;
                Ok(config)
            }
        }
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<TutorConfig, TutorError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built configuration (e.g. after CLI overrides)
    pub fn validate(config: &TutorConfig) -> Result<(), TutorError> {
        validator::validate(config)
    }

    /// Serialize TutorConfig to TOML string
    pub fn to_toml(config: &TutorConfig) -> Result<String, TutorError> {
        toml::to_string_pretty(config)
            .map_err(|e| TutorError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize TutorConfig to JSON string
    pub fn to_json(config: &TutorConfig) -> Result<String, TutorError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| TutorError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, TutorError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            TutorError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| TutorError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, TutorError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<TutorConfig, TutorError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
