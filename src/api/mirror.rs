/// Mirror generation endpoints
use crate::{
    api::parse_body,
    context::AppContext,
    db::Mirror,
    error::OxbowResult,
    mirror::{fallback, Day1MirrorOutcome, PreviewOutcome, StandardMirrorOutcome},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/generate-mirror", post(generate_mirror))
        .route("/generate-day-1-mirror", post(generate_day1_mirror))
}

/// Preview answers 200 even when over quota, so it checks the limiter itself
pub fn preview_routes() -> Router<AppContext> {
    Router::new().route("/generate-onboarding-preview", post(generate_onboarding_preview))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMirrorRequest {
    #[validate(length(min = 1, message = "customUserId is required"))]
    pub custom_user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMirrorResponse {
    pub success: bool,
    pub mirror: Mirror,
    pub journals_used: usize,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDay1Request {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateDay1Response {
    pub success: bool,
    pub mirror: Mirror,
    pub summaries: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingPreviewRequest {
    #[validate(length(min = 1, message = "journalContent is required"))]
    pub journal_content: String,
}

/// POST /generate-mirror
///
/// Admission failures answer 400; anything after admission answers 500 with
/// the failure taxonomy.
async fn generate_mirror(
    State(ctx): State<AppContext>,
    body: Result<Json<GenerateMirrorRequest>, JsonRejection>,
) -> Response {
    match run_standard(&ctx, body).await {
        Ok(outcome) => Json(GenerateMirrorResponse {
            success: true,
            mirror: outcome.mirror,
            journals_used: outcome.journals_used,
        })
        .into_response(),
        Err(e) if e.status_code() == StatusCode::BAD_REQUEST => {
            warn!(error = %e, "Mirror request rejected");
            e.into_response()
        }
        Err(e) => {
            error!(error_type = e.error_type(), error = %e, "Mirror generation request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.public_message(),
                    "errorType": e.error_type(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
                .into_response()
        }
    }
}

async fn run_standard(
    ctx: &AppContext,
    body: Result<Json<GenerateMirrorRequest>, JsonRejection>,
) -> OxbowResult<StandardMirrorOutcome> {
    let request = parse_body(body)?;
    ctx.mirrors()?.generate_standard(&request.custom_user_id).await
}

/// POST /generate-day-1-mirror
async fn generate_day1_mirror(
    State(ctx): State<AppContext>,
    body: Result<Json<GenerateDay1Request>, JsonRejection>,
) -> Response {
    match run_day1(&ctx, body).await {
        Ok(outcome) => Json(GenerateDay1Response {
            success: true,
            mirror: outcome.mirror,
            summaries: outcome.summaries,
        })
        .into_response(),
        Err(e) => {
            error!(error_type = e.error_type(), error = %e, "Day 1 Mirror request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": e.public_message()})),
            )
                .into_response()
        }
    }
}

async fn run_day1(
    ctx: &AppContext,
    body: Result<Json<GenerateDay1Request>, JsonRejection>,
) -> OxbowResult<Day1MirrorOutcome> {
    let request = parse_body(body)?;
    ctx.mirrors()?.generate_day1(&request.user_id).await
}

/// POST /generate-onboarding-preview
///
/// Always 200; on failure the app renders `fallback`.
async fn generate_onboarding_preview(
    State(ctx): State<AppContext>,
    body: Result<Json<OnboardingPreviewRequest>, JsonRejection>,
) -> Json<Value> {
    match run_preview(&ctx, body).await {
        Ok(outcome) => Json(json!({"success": true, "content": outcome.content})),
        Err(e) => {
            warn!(error_type = e.error_type(), error = %e, "Onboarding preview failed, serving fallback");
            Json(json!({
                "success": false,
                "error": e.public_message(),
                "fallback": fallback::preview_fallback(),
            }))
        }
    }
}

async fn run_preview(
    ctx: &AppContext,
    body: Result<Json<OnboardingPreviewRequest>, JsonRejection>,
) -> OxbowResult<PreviewOutcome> {
    let request = parse_body(body)?;
    ctx.rate_limiter.check_generation()?;
    ctx.mirrors()?
        .generate_preview(&request.journal_content)
        .await
}
