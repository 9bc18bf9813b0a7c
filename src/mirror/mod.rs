/// Mirror generation
///
/// Prompts fan out to three concurrent completions, the assembler folds them
/// into typed screen content, and `MirrorService` drives one request through
/// validation, retry, persistence and journal linkage.
pub mod assembler;
pub mod content;
pub mod fallback;
pub mod focus;
pub mod prompts;
pub mod retry;
pub mod sanitize;
pub mod service;

pub use assembler::{Assembled, Day1Assembled, MirrorAssembler};
pub use content::{BiblicalScreen, MirrorContent, Screens};
pub use prompts::PromptSet;
pub use retry::{generate_with_retry, RetryPolicy};
pub use service::{Day1MirrorOutcome, MirrorService, PreviewOutcome, StandardMirrorOutcome};

use crate::llm::FailureKind;
use thiserror::Error;

/// Terminal failure of one assembly attempt
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Core call rejected by provider moderation
    #[error(
        "Mirror generation was blocked by the AI provider's content policy. \
         Some journal content was flagged as sensitive; please review recent entries and try again."
    )]
    ContentFilter { label: String },

    /// Core call failed for any other reason
    #[error("Mirror generation failed: {label} call returned {}: {detail}", .reason.as_str())]
    CoreFailed {
        label: String,
        reason: FailureKind,
        detail: String,
    },
}

impl GenerationError {
    pub fn error_type(&self) -> &'static str {
        match self {
            GenerationError::ContentFilter { .. } => FailureKind::ContentFilter.as_str(),
            GenerationError::CoreFailed { reason, .. } => reason.as_str(),
        }
    }
}
