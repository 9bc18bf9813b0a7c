/// Push notification and reminder endpoints
use crate::{
    api::parse_body,
    context::AppContext,
    error::{OxbowError, OxbowResult},
    jobs::tasks::{self, ReminderSummary},
    push::PushMessage,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/send-push-notification", post(send_push_notification))
        .route("/wednesday-journal-reminder", post(wednesday_journal_reminder))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendPushRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "body must be 1-2000 characters"))]
    pub body: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: ReminderSummary,
}

/// POST /send-push-notification
async fn send_push_notification(
    State(ctx): State<AppContext>,
    body: Result<Json<SendPushRequest>, JsonRejection>,
) -> OxbowResult<Json<Value>> {
    let request = parse_body(body)?;

    let user = ctx
        .users
        .get(&request.user_id)
        .await?
        .ok_or_else(|| OxbowError::NotFound(format!("User {}", request.user_id)))?;

    let token = user
        .push_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            OxbowError::Precondition("User has no push token registered".to_string())
        })?;

    ctx.push
        .send(
            &PushMessage {
                to: token,
                title: request.title,
                body: request.body,
                data: request.data,
            },
            "direct",
        )
        .await?;

    info!(user_id = %request.user_id, "Push notification sent");
    Ok(Json(json!({"success": true})))
}

/// POST /wednesday-journal-reminder
async fn wednesday_journal_reminder(
    State(ctx): State<AppContext>,
) -> OxbowResult<Json<ReminderResponse>> {
    let summary = tasks::send_wednesday_reminders(&ctx, Utc::now()).await?;
    Ok(Json(ReminderResponse {
        success: true,
        summary,
    }))
}
