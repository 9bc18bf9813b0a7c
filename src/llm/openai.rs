/// OpenAI-compatible chat-completion and transcription backend
use crate::{
    config::LlmConfig,
    error::{OxbowError, OxbowResult},
    llm::{BackendError, ChatBackend, ChatReply, ChatRequest, SpeechToText, TokenUsage},
};
use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You are a thoughtful Christian spiritual companion. \
You always respond with a single valid JSON object and nothing else.";

/// HTTP transport for the provider
///
/// One request per call. Timeouts and retries belong to the callers.
#[derive(Clone)]
pub struct OpenAiBackend {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    transcription_model: String,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ApiChatRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: Option<ApiChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTranscription {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
}

impl OpenAiBackend {
    /// Create a backend; the API key must be present
    pub fn new(config: &LlmConfig) -> OxbowResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| OxbowError::Configuration("OPENAI_API_KEY is not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("oxbow-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OxbowError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            transcription_model: config.transcription_model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Pull `error.message` out of a provider error body, falling back to the raw text
fn error_message(body: &str, status: u16) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope
            .error
            .message
            .unwrap_or_else(|| format!("Provider returned HTTP {}", status)),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("Provider returned HTTP {}", status),
    }
}

/// Moderation rejections some providers send as a 400 instead of a finish reason
fn is_content_filter_error(body: &str) -> bool {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.code)
        .map(|code| code == "content_filter")
        .unwrap_or(false)
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        let body = ApiChatRequest {
            model: &self.model,
            messages: [
                ApiMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ApiMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: 0.7,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .http_client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            if is_content_filter_error(&text) {
                return Ok(ChatReply {
                    content: None,
                    finish_reason: Some("content_filter".to_string()),
                    usage: None,
                });
            }

            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(&text, status.as_u16()),
            });
        }

        let parsed: ApiChatResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::Transport(format!("Malformed provider response: {}", e)))?;

        let choice = parsed.choices.into_iter().next();
        let (content, finish_reason) = match choice {
            Some(choice) => (
                choice.message.and_then(|m| m.content),
                choice.finish_reason,
            ),
            None => (None, None),
        };

        Ok(ChatReply {
            content,
            finish_reason,
            usage: parsed.usage,
        })
    }
}

#[async_trait]
impl SpeechToText for OpenAiBackend {
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, BackendError> {
        let part = multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/m4a")
            .map_err(|e| BackendError::Transport(format!("Invalid audio part: {}", e)))?;

        let form = multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        let response = self
            .http_client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: error_message(&text, status.as_u16()),
            });
        }

        let parsed: ApiTranscription = serde_json::from_str(&text).map_err(|e| {
            BackendError::Transport(format!("Malformed transcription response: {}", e))
        })?;

        Ok(parsed.text)
    }
}
