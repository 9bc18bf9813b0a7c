/// Background task implementations
use crate::{
    context::AppContext,
    db::GenerationRequestStore,
    error::OxbowResult,
    jobs::mountain_time,
    metrics,
    push::PushMessage,
};
use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

pub const REMINDER_TITLE: &str = "Wednesday check-in";
pub const REMINDER_BODY: &str =
    "Take a few minutes to journal today. Your group is walking this road with you.";

/// Result of one reminder run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSummary {
    pub is_wednesday: bool,
    pub candidates: usize,
    pub sent: usize,
    pub already_journaled: usize,
    pub failed: usize,
}

/// Remind cohort members who have not journaled today
///
/// Does nothing unless `now` falls on a Wednesday in Mountain Time. A failed
/// send is counted and the run moves on to the next member.
pub async fn send_wednesday_reminders(
    ctx: &AppContext,
    now: DateTime<Utc>,
) -> OxbowResult<ReminderSummary> {
    let local = mountain_time::to_mountain(now);
    if local.weekday() != Weekday::Wed {
        info!(weekday = %local.weekday(), "Not Wednesday in Mountain Time, skipping reminders");
        metrics::record_reminder_run("skipped");
        return Ok(ReminderSummary::default());
    }

    let (day_start, day_end) = mountain_time::day_bounds_utc(local.date_naive())?;
    let members = ctx
        .users
        .list_group_with_push_tokens(&ctx.config.reminders.cohort_name)
        .await?;

    let mut summary = ReminderSummary {
        is_wednesday: true,
        candidates: members.len(),
        ..Default::default()
    };

    for member in members {
        let journaled = ctx
            .journals
            .count_between(&member.id, day_start, day_end)
            .await?;
        if journaled > 0 {
            summary.already_journaled += 1;
            continue;
        }

        let Some(token) = member.push_token else {
            continue;
        };

        let message = PushMessage {
            to: token,
            title: REMINDER_TITLE.to_string(),
            body: REMINDER_BODY.to_string(),
            data: Some(json!({"type": "wednesday_reminder"})),
        };

        match ctx.push.send(&message, "reminder").await {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                warn!(user_id = %member.id, error = %e, "Failed to send Wednesday reminder");
                summary.failed += 1;
            }
        }
    }

    metrics::record_reminder_run(if summary.failed > 0 { "failed" } else { "sent" });
    info!(
        candidates = summary.candidates,
        sent = summary.sent,
        already_journaled = summary.already_journaled,
        failed = summary.failed,
        "Wednesday reminders finished"
    );

    Ok(summary)
}

/// Fail generation requests abandoned in `processing`
///
/// Anything older than the full retry budget cannot still be running.
pub async fn fail_abandoned_requests(ctx: &AppContext) -> OxbowResult<u64> {
    let mirror = &ctx.config.mirror;
    let attempts = i64::from(mirror.max_retries) + 1;
    let budget_secs = attempts * ctx.config.llm.mirror_timeout_secs as i64
        + i64::from(mirror.max_retries) * (mirror.retry_delay_ms as i64 / 1000 + 1);

    let cutoff = Utc::now() - Duration::seconds(budget_secs * 2);
    GenerationRequestStore::new(ctx.db.clone())
        .fail_stale(cutoff)
        .await
}

/// Health check - verify the database answers
pub async fn health_check(ctx: &AppContext) -> OxbowResult<()> {
    crate::db::test_connection(&ctx.db).await
}
