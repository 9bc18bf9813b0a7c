/// Mirror request orchestration
///
/// Each entry point runs `validating -> processing -> completed | failed`.
/// Validation finishes before any row is written; the standard path records
/// its lifecycle in `generation_requests`, Day 1 writes back to its progress
/// row, and previews persist nothing.
use crate::{
    config::{MirrorConfig, ServerConfig},
    db::{
        Day1ProgressStore, GenerationRequestStore, JournalEntry, JournalStore, Mirror,
        MirrorStore, MirrorType, NewMirror, SpiritualPlace, TranscriptionStatus, UserStore,
    },
    error::{OxbowError, OxbowResult},
    llm::{CompletionClient, TokenUsage},
    metrics,
    mirror::{
        generate_with_retry, prompts, sanitize, Assembled, Day1Assembled, MirrorAssembler,
        MirrorContent, RetryPolicy,
    },
};
use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct StandardMirrorOutcome {
    pub mirror: Mirror,
    pub journals_used: usize,
    pub request_id: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub struct Day1MirrorOutcome {
    pub mirror: Mirror,
    pub summaries: Vec<String>,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub struct PreviewOutcome {
    pub content: Value,
    pub usage: TokenUsage,
}

/// Users with a standard Mirror currently being generated
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

struct InFlightGuard {
    set: InFlight,
    user_id: String,
}

impl InFlight {
    fn acquire(&self, user_id: &str) -> Option<InFlightGuard> {
        let mut users = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !users.insert(user_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set: self.clone(),
            user_id: user_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut users = self.set.0.lock().unwrap_or_else(|e| e.into_inner());
        users.remove(&self.user_id);
    }
}

/// Mirror service
#[derive(Clone)]
pub struct MirrorService {
    assembler: MirrorAssembler,
    users: UserStore,
    journals: JournalStore,
    mirrors: MirrorStore,
    requests: GenerationRequestStore,
    day1: Day1ProgressStore,
    thresholds: MirrorConfig,
    retry: RetryPolicy,
    mirror_timeout: Duration,
    preview_timeout: Duration,
    in_flight: InFlight,
}

impl MirrorService {
    pub fn new(db: SqlitePool, client: CompletionClient, config: &ServerConfig) -> Self {
        Self {
            assembler: MirrorAssembler::new(client),
            users: UserStore::new(db.clone()),
            journals: JournalStore::new(db.clone()),
            mirrors: MirrorStore::new(db.clone()),
            requests: GenerationRequestStore::new(db.clone()),
            day1: Day1ProgressStore::new(db),
            thresholds: config.mirror.clone(),
            retry: RetryPolicy::from(&config.mirror),
            mirror_timeout: config.llm.mirror_timeout(),
            preview_timeout: config.llm.preview_timeout(),
            in_flight: InFlight::default(),
        }
    }

    /// Generate a standard Mirror from every unassigned journal of `user_id`
    pub async fn generate_standard(&self, user_id: &str) -> OxbowResult<StandardMirrorOutcome> {
        let _guard = self.in_flight.acquire(user_id).ok_or_else(|| {
            OxbowError::Precondition(
                "A Mirror is already being generated for this user. Please wait for it to finish."
                    .to_string(),
            )
        })?;

        let user = self.users.get(user_id).await?;
        let threshold = self
            .thresholds
            .threshold_for(user.as_ref().and_then(|u| u.group_name.as_deref()));

        let journals = self.journals.list_unassigned(user_id).await?;
        if journals.len() < threshold {
            info!(
                user_id = %user_id,
                journals = journals.len(),
                threshold,
                "Not enough journals for a Mirror"
            );
            return Err(OxbowError::Precondition(format!(
                "Need at least {} journals for Mirror generation. Currently have {}.",
                threshold,
                journals.len()
            )));
        }

        let request = self.requests.start(user_id).await?;
        let started = Instant::now();
        info!(
            user_id = %user_id,
            request_id = %request.id,
            journals = journals.len(),
            "Mirror generation started"
        );

        match self.process_standard(user_id, &request.id, &journals).await {
            Ok((mirror, usage)) => {
                metrics::record_mirror_generation(
                    MirrorType::Standard.as_str(),
                    "completed",
                    started.elapsed().as_secs_f64(),
                );
                info!(
                    user_id = %user_id,
                    request_id = %request.id,
                    mirror_id = %mirror.id,
                    total_tokens = usage.total_tokens,
                    "Mirror generation completed"
                );
                Ok(StandardMirrorOutcome {
                    mirror,
                    journals_used: journals.len(),
                    request_id: request.id,
                    usage,
                })
            }
            Err(e) => {
                if let Err(mark_err) = self.requests.mark_failed(&request.id, &e.to_string()).await {
                    error!(
                        request_id = %request.id,
                        error = %mark_err,
                        "Failed to record generation failure"
                    );
                }
                metrics::record_mirror_generation(
                    MirrorType::Standard.as_str(),
                    "failed",
                    started.elapsed().as_secs_f64(),
                );
                metrics::record_error(e.error_type(), "mirror");
                error!(
                    user_id = %user_id,
                    request_id = %request.id,
                    error_type = e.error_type(),
                    error = %e,
                    "Mirror generation failed"
                );
                Err(e)
            }
        }
    }

    async fn process_standard(
        &self,
        user_id: &str,
        request_id: &str,
        journals: &[JournalEntry],
    ) -> OxbowResult<(Mirror, TokenUsage)> {
        let started_at = Utc::now();
        let prompts = prompts::standard_prompts(journals);

        let assembled = generate_with_retry(self.retry, "standard_mirror", || {
            self.assembler.assemble_standard(&prompts, self.mirror_timeout)
        })
        .await?;

        let Assembled { content, usage } = assembled;
        let mirror = self
            .persist(user_id, content, None, journals.len(), started_at)
            .await?;

        let journal_ids: Vec<String> = journals.iter().map(|j| j.id.clone()).collect();
        self.link(&journal_ids, &mirror.id).await;

        self.requests.mark_completed(request_id, &mirror.id).await?;
        Ok((mirror, usage))
    }

    /// Generate the Day 1 mini-Mirror from the two seed journals
    pub async fn generate_day1(&self, user_id: &str) -> OxbowResult<Day1MirrorOutcome> {
        let (place, first, second) = self.validate_day1(user_id).await?;
        let started = Instant::now();
        info!(user_id = %user_id, spiritual_place = place.as_str(), "Day 1 Mirror generation started");

        match self.process_day1(user_id, place, &first, &second).await {
            Ok(outcome) => {
                metrics::record_mirror_generation(
                    MirrorType::Day1.as_str(),
                    "completed",
                    started.elapsed().as_secs_f64(),
                );
                info!(user_id = %user_id, mirror_id = %outcome.mirror.id, "Day 1 Mirror generation completed");
                Ok(outcome)
            }
            Err(e) => {
                if let Err(mark_err) = self.day1.mark_failed(user_id).await {
                    warn!(user_id = %user_id, error = %mark_err, "Failed to record Day 1 failure");
                }
                metrics::record_mirror_generation(
                    MirrorType::Day1.as_str(),
                    "failed",
                    started.elapsed().as_secs_f64(),
                );
                metrics::record_error(e.error_type(), "day1_mirror");
                error!(user_id = %user_id, error_type = e.error_type(), error = %e, "Day 1 Mirror generation failed");
                Err(e)
            }
        }
    }

    async fn validate_day1(
        &self,
        user_id: &str,
    ) -> OxbowResult<(SpiritualPlace, JournalEntry, JournalEntry)> {
        let progress = self
            .day1
            .get(user_id)
            .await?
            .ok_or_else(|| OxbowError::Precondition("Day 1 progress not found".to_string()))?;

        let place = progress.spiritual_place.ok_or_else(|| {
            OxbowError::Precondition("Spiritual place has not been selected".to_string())
        })?;

        let (Some(first_id), Some(second_id)) = (progress.journal_1_id, progress.journal_2_id)
        else {
            return Err(OxbowError::Precondition(
                "Both Day 1 journals are required".to_string(),
            ));
        };

        let first = self.day1_journal(&first_id).await?;
        let second = self.day1_journal(&second_id).await?;
        Ok((place, first, second))
    }

    async fn day1_journal(&self, journal_id: &str) -> OxbowResult<JournalEntry> {
        let journal = self.journals.get(journal_id).await?.ok_or_else(|| {
            OxbowError::Precondition(format!("Day 1 journal {} not found", journal_id))
        })?;

        if journal.mirror_id.is_some() {
            return Err(OxbowError::Precondition(format!(
                "Day 1 journal {} already belongs to a Mirror",
                journal_id
            )));
        }

        if journal.transcription_status != Some(TranscriptionStatus::Completed) {
            return Err(OxbowError::Precondition(format!(
                "Day 1 journal {} has not finished transcribing",
                journal_id
            )));
        }

        Ok(journal)
    }

    async fn process_day1(
        &self,
        user_id: &str,
        place: SpiritualPlace,
        first: &JournalEntry,
        second: &JournalEntry,
    ) -> OxbowResult<Day1MirrorOutcome> {
        let started_at = Utc::now();
        let prompts = prompts::day1_prompts(place, first, second);

        let Day1Assembled {
            summaries,
            biblical,
            usage,
        } = generate_with_retry(self.retry, "day1_mirror", || {
            self.assembler.assemble_day1(&prompts, self.mirror_timeout)
        })
        .await?;

        let content = MirrorContent::Day1 {
            summaries: summaries.clone(),
            biblical,
        };

        let mirror = self
            .persist(user_id, content, Some(place), 2, started_at)
            .await?;

        self.link(&[first.id.clone(), second.id.clone()], &mirror.id)
            .await;

        self.day1.complete(user_id, &mirror.id).await?;

        Ok(Day1MirrorOutcome {
            mirror,
            summaries,
            usage,
        })
    }

    /// Generate a throwaway preview from one journal's text
    pub async fn generate_preview(&self, journal_content: &str) -> OxbowResult<PreviewOutcome> {
        if journal_content.trim().is_empty() {
            return Err(OxbowError::Validation(
                "journalContent cannot be empty".to_string(),
            ));
        }

        let started = Instant::now();
        let prompts = prompts::preview_prompts(journal_content);

        let result = generate_with_retry(self.retry, "onboarding_preview", || {
            self.assembler
                .assemble_standard(&prompts, self.preview_timeout)
        })
        .await;

        let outcome = if result.is_ok() { "completed" } else { "failed" };
        metrics::record_mirror_generation("preview", outcome, started.elapsed().as_secs_f64());

        let Assembled { content, usage } = result?;
        Ok(PreviewOutcome {
            content: sanitize::sanitized(content.to_json()),
            usage,
        })
    }

    async fn persist(
        &self,
        user_id: &str,
        content: MirrorContent,
        spiritual_place: Option<SpiritualPlace>,
        journal_count: usize,
        started_at: chrono::DateTime<Utc>,
    ) -> OxbowResult<Mirror> {
        let mirror_type = content.mirror_type();
        let screens = content.into_screens(spiritual_place);

        self.mirrors
            .insert_completed(NewMirror {
                user_id: user_id.to_string(),
                themes: sanitize::sanitized(screens.themes),
                biblical: sanitize::sanitized(screens.biblical),
                observations: screens.observations.map(sanitize::sanitized),
                journal_count: journal_count as i64,
                mirror_type,
                generation_started_at: started_at,
            })
            .await
    }

    /// Best-effort: the Mirror is already saved
    async fn link(&self, journal_ids: &[String], mirror_id: &str) {
        let report = self.journals.link_to_mirror(journal_ids, mirror_id).await;
        if !report.failed.is_empty() {
            warn!(
                mirror_id = %mirror_id,
                linked = report.linked,
                failed = report.failed.len(),
                "Some journals could not be linked to the Mirror"
            );
        }
    }
}
