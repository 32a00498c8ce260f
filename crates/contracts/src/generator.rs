//! TextGenerator trait - text-generation backend interface
//!
//! The backend is an opaque external collaborator. The orchestrator only
//! hands it a fully rendered request and waits for the complete text.

use serde::Serialize;

use crate::GenerationError;

/// Fully rendered request for one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Stage issuing the request (used for logging/metrics and by stubs)
    pub stage: String,

    /// Rendered system prompt, if the stage has one
    pub system: Option<String>,

    /// Rendered user prompt
    pub prompt: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Completion token limit (None = backend default)
    pub max_tokens: Option<u32>,
}

/// Text generation backend
///
/// All backend implementations must implement this trait.
#[trait_variant::make(TextGenerator: Send)]
pub trait LocalTextGenerator {
    /// Backend name (used for logging)
    fn name(&self) -> &str;

    /// Generate text for a rendered request
    ///
    /// Waits for the full response; partial tokens are not surfaced.
    ///
    /// # Errors
    /// Authentication, rate-limit, transport and protocol failures, all as
    /// `GenerationError`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
