//! Layered error definitions
//!
//! Categorized by source: config / template / generation / state

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum TutorError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Credential environment variable absent or empty
    #[error("missing credential: environment variable '{var}' is not set")]
    MissingCredential { var: String },

    // ===== Pipeline Errors =====
    /// Stage template could not be rendered
    #[error("template error in stage '{stage}': {source}")]
    Template {
        stage: String,
        #[source]
        source: TemplateError,
    },

    /// Backend call failed for a stage
    #[error("stage '{stage}' generation failed: {source}")]
    Generation {
        stage: String,
        #[source]
        source: GenerationError,
    },

    /// Output key written twice
    #[error("duplicate output key '{key}': pipeline state is write-once")]
    DuplicateOutput { key: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TutorError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create template error for a stage
    pub fn template(stage: impl Into<String>, source: TemplateError) -> Self {
        Self::Template {
            stage: stage.into(),
            source,
        }
    }

    /// Create generation error for a stage
    pub fn generation(stage: impl Into<String>, source: GenerationError) -> Self {
        Self::Generation {
            stage: stage.into(),
            source,
        }
    }

    /// Create duplicate output error
    pub fn duplicate_output(key: impl Into<String>) -> Self {
        Self::DuplicateOutput { key: key.into() }
    }

    /// Backend failure, if this error wraps one
    pub fn as_generation(&self) -> Option<&GenerationError> {
        match self {
            Self::Generation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Template parse / render error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Placeholder has no bound value
    #[error("placeholder '{{{placeholder}}}' has no bound value")]
    Unbound { placeholder: String },

    /// Malformed placeholder syntax
    #[error("malformed template at byte {position}: {message}")]
    Syntax { position: usize, message: String },
}

/// Text-generation backend error
///
/// Authentication, rate-limit, transport and timeout failures are all folded
/// into this type; the orchestrator never retries any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Credential rejected (401 / 403)
    #[error("authentication rejected: {message}")]
    Auth { message: String },

    /// Backend throttled the request (429)
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// Connection / DNS / TLS failure
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Stage exceeded its time budget
    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Any other non-success status
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not carry generated text
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

impl GenerationError {
    /// Create transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Api { .. } => "api",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
