//! API credential loading
//!
//! Loaded once at startup, before the first stage runs. A missing credential
//! is a fatal startup error.

use std::fmt;

use contracts::TutorError;

/// Backend API key
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential {
    source_var: String,
    secret: String,
}

impl ApiCredential {
    /// Read the credential from environment variable `var`
    ///
    /// # Errors
    /// `TutorError::MissingCredential` if the variable is unset or blank.
    pub fn from_env(var: &str) -> Result<Self, TutorError> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => {
                tracing::debug!(var, "API credential loaded from environment");
                Ok(Self {
                    source_var: var.to_string(),
                    secret: value.trim().to_string(),
                })
            }
            _ => Err(TutorError::MissingCredential {
                var: var.to_string(),
            }),
        }
    }

    /// Build from an explicit secret (tests, embedding applications)
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            source_var: String::new(),
            secret: secret.into(),
        }
    }

    /// Raw secret, for the Authorization header
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Environment variable the credential came from (empty if explicit)
    pub fn source_var(&self) -> &str {
        &self.source_var
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("source_var", &self.source_var)
            .field("secret", &"***")
            .finish()
    }
}
