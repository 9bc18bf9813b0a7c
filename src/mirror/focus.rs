/// Focus theme extraction
use crate::{
    llm::{CallOutcome, CompletionClient},
    mirror::prompts,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const FALLBACK_THEME: &str = "Growth";

/// One or two word theme for a user's focus text
///
/// Never fails: without a client, on any call failure, or on an empty
/// answer the theme is `FALLBACK_THEME`.
pub async fn extract_focus_theme(
    client: Option<&CompletionClient>,
    focus_text: &str,
    timeout: Duration,
) -> String {
    let Some(client) = client else {
        debug!("No LLM provider configured, using fallback focus theme");
        return FALLBACK_THEME.to_string();
    };
    if focus_text.trim().is_empty() {
        return FALLBACK_THEME.to_string();
    }

    let result = client
        .complete(&prompts::focus_theme_prompt(focus_text), "focus_theme", timeout)
        .await;

    let raw = match result.outcome {
        CallOutcome::Success(Value::Object(map)) => map
            .get("theme")
            .and_then(Value::as_str)
            .map(str::to_string),
        CallOutcome::Success(Value::String(s)) => Some(s),
        CallOutcome::Success(_) => None,
        CallOutcome::Failure(failure) => {
            warn!(
                finish_reason = failure.kind.as_str(),
                error = %failure.message,
                "Focus theme extraction failed"
            );
            None
        }
    };

    raw.and_then(|theme| normalize_theme(&theme))
        .unwrap_or_else(|| FALLBACK_THEME.to_string())
}

/// Strip quotes and keep at most two words
pub fn normalize_theme(raw: &str) -> Option<String> {
    let theme = raw
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”')))
        .filter(|word| !word.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");

    (!theme.is_empty()).then_some(theme)
}
