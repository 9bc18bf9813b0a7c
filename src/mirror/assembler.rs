/// Mirror assembler
///
/// Issues the core, verse and invitation completions concurrently and waits
/// for all three. Only the core call can fail the assembly.
use crate::{
    llm::{CallOutcome, CallResult, CompletionClient, FailureKind, TokenUsage},
    mirror::{
        content::{Day1Core, StandardCore},
        BiblicalScreen, GenerationError, MirrorContent, PromptSet,
    },
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const CORE_LABEL: &str = "core";
pub const VERSE_LABEL: &str = "verse";
pub const INVITATION_LABEL: &str = "invitation";

const VERSE_KEY: &str = "encouraging_verse";
const INVITATION_KEY: &str = "invitation_to_growth";

/// Content plus usage summed over all three calls
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub content: MirrorContent,
    pub usage: TokenUsage,
}

/// Day 1 pieces, kept apart so callers read the summaries directly
#[derive(Debug, Clone, PartialEq)]
pub struct Day1Assembled {
    pub summaries: Vec<String>,
    pub biblical: BiblicalScreen,
    pub usage: TokenUsage,
}

struct FanOut {
    core: CallResult,
    verse: CallResult,
    invitation: CallResult,
}

impl FanOut {
    fn usage(&self) -> TokenUsage {
        TokenUsage::sum([
            self.core.usage.as_ref(),
            self.verse.usage.as_ref(),
            self.invitation.usage.as_ref(),
        ])
    }
}

#[derive(Clone)]
pub struct MirrorAssembler {
    client: CompletionClient,
}

impl MirrorAssembler {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    /// Themes, biblical parallel and observations
    pub async fn assemble_standard(
        &self,
        prompts: &PromptSet,
        timeout: Duration,
    ) -> Result<Assembled, GenerationError> {
        let calls = self.fan_out(prompts, timeout).await;
        let usage = calls.usage();
        let core: StandardCore = require_core(calls.core)?;

        Ok(Assembled {
            content: MirrorContent::Standard {
                themes: core.themes,
                biblical: BiblicalScreen {
                    parallel_story: core.parallel_story,
                    encouraging_verse: optional_field(calls.verse, VERSE_KEY),
                    invitation_to_growth: optional_field(calls.invitation, INVITATION_KEY),
                },
                observations: core.observations,
            },
            usage,
        })
    }

    /// One-line summaries and biblical parallel for Day 1
    pub async fn assemble_day1(
        &self,
        prompts: &PromptSet,
        timeout: Duration,
    ) -> Result<Day1Assembled, GenerationError> {
        let calls = self.fan_out(prompts, timeout).await;
        let usage = calls.usage();
        let core: Day1Core = require_core(calls.core)?;

        Ok(Day1Assembled {
            summaries: core.one_line_summaries,
            biblical: BiblicalScreen {
                parallel_story: core.parallel_story,
                encouraging_verse: optional_field(calls.verse, VERSE_KEY),
                invitation_to_growth: optional_field(calls.invitation, INVITATION_KEY),
            },
            usage,
        })
    }

    async fn fan_out(&self, prompts: &PromptSet, timeout: Duration) -> FanOut {
        let (core, verse, invitation) = tokio::join!(
            self.client.complete(&prompts.core, CORE_LABEL, timeout),
            self.client.complete(&prompts.verse, VERSE_LABEL, timeout),
            self.client.complete(&prompts.invitation, INVITATION_LABEL, timeout),
        );

        debug!(
            core = core.finish_reason(),
            verse = verse.finish_reason(),
            invitation = invitation.finish_reason(),
            "Mirror fan-out settled"
        );

        FanOut {
            core,
            verse,
            invitation,
        }
    }
}

/// Promote anything but a well-formed core payload to a terminal error
fn require_core<T: DeserializeOwned>(result: CallResult) -> Result<T, GenerationError> {
    match result.outcome {
        CallOutcome::Success(value) => {
            serde_json::from_value(value).map_err(|e| GenerationError::CoreFailed {
                label: result.label.clone(),
                reason: FailureKind::ParseError,
                detail: e.to_string(),
            })
        }
        CallOutcome::Failure(f) if f.kind == FailureKind::ContentFilter => {
            Err(GenerationError::ContentFilter {
                label: result.label,
            })
        }
        CallOutcome::Failure(f) => Err(GenerationError::CoreFailed {
            label: result.label,
            reason: f.kind,
            detail: f.message,
        }),
    }
}

/// Payload of an optional call, or `None` with a log line
///
/// Accepts either `{key: {...}}` or the bare object.
fn optional_field(result: CallResult, key: &str) -> Option<Value> {
    match result.outcome {
        CallOutcome::Success(mut value) => match value.get_mut(key).map(Value::take) {
            Some(Value::Null) => {
                warn!(label = %result.label, "optional Mirror field came back null");
                None
            }
            Some(inner) => Some(inner),
            None if value.is_object() => Some(value),
            None => {
                warn!(label = %result.label, "optional Mirror field had an unexpected shape");
                None
            }
        },
        CallOutcome::Failure(f) => {
            warn!(
                label = %result.label,
                finish_reason = f.kind.as_str(),
                error = %f.message,
                "optional Mirror call failed, leaving field empty"
            );
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const STANDARD_CORE: &str = r#"{
        "themes": {"title": "What keeps coming up", "themes": [{"name": "Trust", "description": "You return to trusting God with work."}]},
        "parallel_story": {"character": "Joseph", "scripture_reference": "Genesis 37-50", "story": "Sold by his brothers.", "connection": "Waiting in hard places."},
        "observations": {"title": "Patterns", "patterns": ["You pray most at night."], "growth": ["More gratitude lately."]}
    }"#;

    pub const DAY1_CORE: &str = r#"{
        "one_line_summaries": ["You feel distant from God.", "You want to start again."],
        "parallel_story": {"character": "The prodigal son", "scripture_reference": "Luke 15:11-32", "story": "He came home.", "connection": "The door is open."}
    }"#;

    pub const VERSE: &str =
        r#"{"encouraging_verse": {"reference": "Psalm 46:10", "text": "Be still, and know that I am God.", "reflection": "Rest."}}"#;

    pub const INVITATION: &str = r#"{"invitation_to_growth": {"title": "Sit still", "invitation": "Take five quiet minutes.", "practical_steps": ["Pray before work"]}}"#;
}
