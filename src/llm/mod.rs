/// LLM provider access
///
/// `ChatBackend` and `SpeechToText` are the seams to the provider; the
/// OpenAI-compatible HTTP implementation lives in `openai`. Everything that
/// interprets a reply (timeouts, finish reasons, JSON repair) lives in
/// `client` so it behaves the same for any backend.

pub mod client;
pub mod openai;
pub mod repair;

pub use client::{CallFailure, CallOutcome, CallResult, CompletionClient, FailureKind};
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single chat-completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub prompt: String,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object
    pub json_mode: bool,
}

/// Raw provider reply before interpretation
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Provider faults surfaced by a backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Non-2xx HTTP response
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Anything that kept the request from producing a response
    #[error("{0}")]
    Transport(String),
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Sum usage across calls, counting missing reports as zero
    pub fn sum<'a>(usages: impl IntoIterator<Item = Option<&'a TokenUsage>>) -> TokenUsage {
        usages
            .into_iter()
            .flatten()
            .fold(TokenUsage::default(), |acc, u| acc + *u)
    }
}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.saturating_add(rhs.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_add(rhs.completion_tokens),
            total_tokens: self.total_tokens.saturating_add(rhs.total_tokens),
        }
    }
}

/// Chat-completion backend trait
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request; no retries, no timeout of its own
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError>;
}

/// Speech-to-text backend trait
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe raw audio bytes to text
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, BackendError>;
}
