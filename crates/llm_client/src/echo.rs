//! Echo backend
//!
//! Deterministic stand-in for the hosted model: replies
//! `"<stage>:<prompt_length>"` and records every request. Supports injecting
//! a failure at a named stage and an artificial per-call delay.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{GenerationError, GenerationRequest, TextGenerator};
use tracing::instrument;

/// Echo backend configuration
#[derive(Debug, Default, Clone)]
pub struct EchoConfig {
    /// Stage that should fail, and with which error
    pub fail_at: Option<(String, GenerationError)>,
    /// Delay applied before every reply
    pub delay: Option<Duration>,
}

/// Echo backend
///
/// Clones share the request log.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator {
    config: EchoConfig,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self::with_config(EchoConfig::default())
    }

    pub fn with_config(config: EchoConfig) -> Self {
        Self {
            config,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail with `error` when `stage` is invoked
    pub fn failing_at(stage: impl Into<String>, error: GenerationError) -> Self {
        Self::with_config(EchoConfig {
            fail_at: Some((stage.into(), error)),
            ..Default::default()
        })
    }

    /// Reply only after `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = Some(delay);
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<GenerationRequest>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Text the echo backend produces for `request`
    pub fn reply_for(request: &GenerationRequest) -> String {
        format!("{}:{}", request.stage, request.prompt.len())
    }

    /// Number of requests received so far (including failed ones)
    pub fn call_count(&self) -> usize {
        self.log().len()
    }

    /// Copy of every request received so far
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.log().clone()
    }

    /// Stage names in invocation order
    pub fn invoked_stages(&self) -> Vec<String> {
        self.log()
            .iter()
            .map(|request| request.stage.clone())
            .collect()
    }
}

impl TextGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    #[instrument(
        name = "echo_generate",
        skip(self, request),
        fields(stage = %request.stage, prompt_chars = request.prompt.len())
    )]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.log().push(request.clone());

        if let Some(delay) = self.config.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((stage, error)) = &self.config.fail_at {
            if *stage == request.stage {
                return Err(error.clone());
            }
        }

        Ok(Self::reply_for(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(stage: &str, prompt: &str) -> GenerationRequest {
        GenerationRequest {
            stage: stage.into(),
            system: None,
            prompt: prompt.into(),
            model: "echo".into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_echo_reply() {
        let generator = EchoGenerator::new();
        let text = generator.generate(&request("Intro", "12345")).await.unwrap();
        assert_eq!(text, "Intro:5");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let generator =
            EchoGenerator::failing_at("Example", GenerationError::transport("connection reset"));
        assert!(generator.generate(&request("Intro", "a")).await.is_ok());
        let err = generator.generate(&request("Example", "b")).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
        assert_eq!(generator.invoked_stages(), vec!["Intro", "Example"]);
    }

    #[tokio::test]
    async fn test_clones_share_log() {
        let generator = EchoGenerator::new();
        let observer = generator.clone();
        generator.generate(&request("Intro", "x")).await.unwrap();
        assert_eq!(observer.call_count(), 1);
        assert_eq!(observer.calls()[0].prompt, "x");
    }
}
