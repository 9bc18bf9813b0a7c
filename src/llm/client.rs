/// Completion client
///
/// Wraps one chat-completion call: applies the wall-clock timeout, reads the
/// provider's finish reason, and turns the reply into JSON. Provider and
/// network faults never escape as errors; they come back as a tagged
/// `CallResult` so callers can keep going and still add up token usage.
use crate::{
    llm::{repair, BackendError, ChatBackend, ChatRequest, TokenUsage},
    metrics,
};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

/// Why a call did not yield usable JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    ApiError,
    ContentFilter,
    ParseError,
    Exception,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ApiError => "api_error",
            FailureKind::ContentFilter => "content_filter",
            FailureKind::ParseError => "parse_error",
            FailureKind::Exception => "exception",
        }
    }
}

/// Details of a failed call
#[derive(Debug, Clone, PartialEq)]
pub struct CallFailure {
    pub kind: FailureKind,
    /// HTTP status for `api_error`
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success(Value),
    Failure(CallFailure),
}

/// Outcome of one labelled call plus whatever usage the provider reported
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    pub label: String,
    pub outcome: CallOutcome,
    pub usage: Option<TokenUsage>,
}

impl CallResult {
    /// `stop` on success, otherwise the failure tag
    pub fn finish_reason(&self) -> &'static str {
        match &self.outcome {
            CallOutcome::Success(_) => "stop",
            CallOutcome::Failure(f) => f.kind.as_str(),
        }
    }

    pub fn content_filter_triggered(&self) -> bool {
        matches!(
            &self.outcome,
            CallOutcome::Failure(CallFailure {
                kind: FailureKind::ContentFilter,
                ..
            })
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CallOutcome::Success(_))
    }
}

/// Client for single JSON-mode completions
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn ChatBackend>,
    max_output_tokens: u32,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn ChatBackend>, max_output_tokens: u32) -> Self {
        Self {
            backend,
            max_output_tokens,
        }
    }

    /// Run one completion under `timeout`
    ///
    /// The request future is dropped on timeout, which aborts the HTTP call.
    pub async fn complete(&self, prompt: &str, label: &str, timeout: Duration) -> CallResult {
        let started = Instant::now();
        let request = ChatRequest {
            prompt: prompt.to_string(),
            max_tokens: self.max_output_tokens,
            json_mode: true,
        };

        let result = match tokio::time::timeout(timeout, self.backend.chat(request)).await {
            Err(_) => failure(
                label,
                FailureKind::Timeout,
                None,
                format!("{} call timed out after {}s", label, timeout.as_secs()),
                None,
            ),
            Ok(Err(BackendError::Status { status, message })) => {
                failure(label, FailureKind::ApiError, Some(status), message, None)
            }
            Ok(Err(BackendError::Transport(message))) => {
                failure(label, FailureKind::Exception, None, message, None)
            }
            Ok(Ok(reply)) => {
                let usage = reply.usage;
                if reply.finish_reason.as_deref() == Some("content_filter") {
                    failure(
                        label,
                        FailureKind::ContentFilter,
                        None,
                        "Response blocked by provider content filter".to_string(),
                        usage,
                    )
                } else {
                    let raw = reply.content.unwrap_or_default();
                    if raw.trim().is_empty() {
                        failure(
                            label,
                            FailureKind::ParseError,
                            None,
                            format!(
                                "Empty response (finish_reason: {})",
                                reply.finish_reason.as_deref().unwrap_or("none")
                            ),
                            usage,
                        )
                    } else {
                        match repair::parse_model_json(&raw) {
                            Ok(parsed) => CallResult {
                                label: label.to_string(),
                                outcome: CallOutcome::Success(parsed.value),
                                usage,
                            },
                            Err(message) => {
                                failure(label, FailureKind::ParseError, None, message, usage)
                            }
                        }
                    }
                }
            }
        };

        let elapsed = started.elapsed();
        metrics::record_llm_call(label, result.finish_reason(), elapsed.as_secs_f64());
        if let Some(usage) = &result.usage {
            metrics::record_token_usage(label, usage);
        }

        match &result.outcome {
            CallOutcome::Success(_) => tracing::info!(
                label = %label,
                elapsed_ms = elapsed.as_millis() as u64,
                total_tokens = result.usage.map(|u| u.total_tokens).unwrap_or(0),
                "LLM call succeeded"
            ),
            CallOutcome::Failure(f) => tracing::warn!(
                label = %label,
                finish_reason = f.kind.as_str(),
                status = ?f.status,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %f.message,
                "LLM call failed"
            ),
        }

        result
    }
}

fn failure(
    label: &str,
    kind: FailureKind,
    status: Option<u16>,
    message: String,
    usage: Option<TokenUsage>,
) -> CallResult {
    CallResult {
        label: label.to_string(),
        outcome: CallOutcome::Failure(CallFailure {
            kind,
            status,
            message,
        }),
        usage,
    }
}
