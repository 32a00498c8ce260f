//! Chat-completions HTTP backend
//!
//! POSTs `{base_url}/chat/completions` with bearer auth and returns
//! `choices[0].message.content`.

use std::time::Duration;

use contracts::{GenerationError, GenerationRequest, TextGenerator};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// HTTP backend configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Bearer token
    pub api_key: String,

    /// Client-side request timeout (None = no limit)
    pub request_timeout: Option<Duration>,
}

impl OpenAiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout: None,
        }
    }

    /// Set the client-side request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Chat-completions client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Build the client
    ///
    /// # Errors
    /// `GenerationError::Transport` if the TLS backend cannot be initialized.
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::transport(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Full chat-completions URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_body<'a>(request: &'a GenerationRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatCompletionRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            let elapsed_ms = self
                .config
                .request_timeout
                .map(|t| t.as_millis() as u64)
                .unwrap_or_default();
            GenerationError::Timeout { elapsed_ms }
        } else {
            GenerationError::transport(err.to_string())
        }
    }

    async fn handle_response(response: Response) -> Result<String, GenerationError> {
        let status = response.status();

        if status.is_success() {
            let body: ChatCompletionResponse = response.json().await.map_err(|e| {
                GenerationError::invalid_response(format!("failed to decode completion: {e}"))
            })?;

            return body
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| {
                    GenerationError::invalid_response("completion has no message content")
                });
        }

        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&raw)
            .map(|envelope| envelope.error.message)
            .unwrap_or(raw);

        warn!(status = status.as_u16(), error = %message, "Completion request rejected");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Auth { message },
            StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited { message },
            _ => GenerationError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

impl TextGenerator for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(
        name = "openai_generate",
        skip(self, request),
        fields(stage = %request.stage, model = %request.model, prompt_chars = request.prompt.len())
    )]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = Self::build_body(request);

        debug!(endpoint = %self.endpoint, "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let text = Self::handle_response(response).await?;
        debug!(response_chars = text.len(), "Completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn request() -> GenerationRequest {
        GenerationRequest {
            stage: "Intro".into(),
            system: Some("You are a tutor.".into()),
            prompt: "Explain p-values.".into(),
            model: "gpt-4".into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    fn client_for(server: &Server) -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig::new(server.url(), "sk-test")).unwrap()
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4",
                "temperature": 0.7,
                "messages": [
                    { "role": "system", "content": "You are a tutor." },
                    { "role": "user", "content": "Explain p-values." }
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"A p-value is..."}}]}"#)
            .create_async()
            .await;

        let text = client_for(&server).generate(&request()).await.unwrap();
        assert_eq!(text, "A p-value is...");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_max_tokens_sent_when_set() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(serde_json::json!({ "max_tokens": 256 })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        let mut req = request();
        req.max_tokens = Some(256);
        assert_eq!(client_for(&server).generate(&req).await.unwrap(), "ok");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create_async()
            .await;

        let err = client_for(&server).generate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            GenerationError::Auth {
                message: "Incorrect API key provided".into()
            }
        );

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let err = client_for(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::RateLimited { ref message } if message == "slow down"
        ));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = client_for(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server).generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        let client =
            OpenAiClient::new(OpenAiConfig::new("http://127.0.0.1:9", "sk-test")).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client =
            OpenAiClient::new(OpenAiConfig::new("https://api.example.com/v1/", "k")).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = OpenAiConfig::new("https://api.example.com", "sk-secret");
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
