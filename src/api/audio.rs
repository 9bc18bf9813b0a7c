/// Audio transcription endpoint
use crate::{
    api::parse_body,
    context::AppContext,
    error::{OxbowError, OxbowResult},
    metrics,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info};
use validator::Validate;

const UPLOAD_FILE_NAME: &str = "audio.m4a";

pub fn routes() -> Router<AppContext> {
    Router::new().route("/transcribe-audio", post(transcribe_audio))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    #[validate(length(min = 1, message = "audioBase64 is required"))]
    pub audio_base64: String,
}

/// POST /transcribe-audio
async fn transcribe_audio(
    State(ctx): State<AppContext>,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Response {
    match transcribe(&ctx, body).await {
        Ok(text) => Json(json!({"success": true, "text": text})).into_response(),
        Err(e) => {
            error!(error = %e, "Transcription failed");
            metrics::record_error(e.error_type(), "transcription");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": e.public_message()})),
            )
                .into_response()
        }
    }
}

async fn transcribe(
    ctx: &AppContext,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> OxbowResult<String> {
    let request = parse_body(body)?;
    let speech = ctx
        .speech
        .as_ref()
        .ok_or_else(|| OxbowError::Configuration("LLM provider is not configured".to_string()))?;

    let audio = decode_audio(&request.audio_base64)?;
    let bytes = audio.len();
    let started = Instant::now();
    let timeout = ctx.config.llm.preview_timeout();

    let text = tokio::time::timeout(timeout, speech.transcribe(audio, UPLOAD_FILE_NAME))
        .await
        .map_err(|_| {
            OxbowError::Upstream(format!(
                "Transcription timed out after {}s",
                timeout.as_secs()
            ))
        })?
        .map_err(|e| OxbowError::Upstream(format!("Transcription failed: {}", e)))?;

    info!(
        bytes,
        chars = text.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Audio transcribed"
    );
    Ok(text)
}

/// Decode base64 audio, tolerating a `data:` URI prefix
fn decode_audio(encoded: &str) -> OxbowResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    let audio = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| OxbowError::Validation(format!("audioBase64 is not valid base64: {}", e)))?;

    if audio.is_empty() {
        return Err(OxbowError::Validation("audioBase64 decoded to no data".to_string()));
    }
    Ok(audio)
}
