/// Focus theme endpoint
use crate::{context::AppContext, mirror::focus};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/extract-focus-theme", post(extract_focus_theme))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusThemeRequest {
    #[serde(default)]
    pub focus_text: String,
}

/// POST /extract-focus-theme
///
/// Always answers 200; a malformed body is treated as empty focus text and
/// an exhausted generation quota yields the fallback theme.
async fn extract_focus_theme(
    State(ctx): State<AppContext>,
    body: Result<Json<FocusThemeRequest>, JsonRejection>,
) -> Json<Value> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    if let Err(e) = ctx.rate_limiter.check_generation() {
        warn!(error = %e, "Focus theme over quota, serving fallback");
        return Json(json!({"success": true, "theme": focus::FALLBACK_THEME}));
    }

    let theme = focus::extract_focus_theme(
        ctx.completion_client.as_ref(),
        &request.focus_text,
        ctx.config.llm.preview_timeout(),
    )
    .await;

    Json(json!({"success": true, "theme": theme}))
}
