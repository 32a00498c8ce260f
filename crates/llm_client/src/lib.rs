//! # LLM Client
//!
//! Text-generation backends.
//!
//! Responsibilities:
//! - Call a hosted chat-completions endpoint (`OpenAiClient`)
//! - Map HTTP / transport failures onto `GenerationError`
//! - Provide a deterministic echo backend for tests and offline runs
//!   (`EchoGenerator`), with failure and latency injection

pub mod echo;
pub mod openai;

pub use contracts::{GenerationError, GenerationRequest, TextGenerator};
pub use echo::{EchoConfig, EchoGenerator};
pub use openai::{OpenAiClient, OpenAiConfig};
