/// End-to-end tests driving the HTTP router in-process
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use oxbow_server::{
    config::ServerConfig,
    context::AppContext,
    db::{memory_pool, Day1ProgressStore, GenerationRequestStore, GenerationStatus, SpiritualPlace, TranscriptionStatus},
    llm::{BackendError, ChatBackend, ChatReply, ChatRequest, SpeechToText, TokenUsage},
    server::build_router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tower::ServiceExt;

const STANDARD_CORE: &str = r#"{
    "themes": {"title": "What keeps coming up", "themes": [{"name": "Trust", "description": "You keep handing work worries to God."}]},
    "parallel_story": {"character": "Joseph", "scripture_reference": "Genesis 37-50", "story": "Sold by his brothers.", "connection": "Waiting in hard places."},
    "observations": {"title": "Patterns", "patterns": ["You pray most at night."], "growth": ["More gratitude lately."]}
}"#;

const DAY1_CORE: &str = r#"{
    "one_line_summaries": ["You feel distant from God.", "You want to start again."],
    "parallel_story": {"character": "The prodigal son", "scripture_reference": "Luke 15:11-32", "story": "He came home.", "connection": "The door is open."}
}"#;

const VERSE: &str = r#"{"encouraging_verse": {"reference": "Psalm 46:10", "text": "Be still, and know that I am God."}}"#;

const INVITATION: &str = r#"{"invitation_to_growth": {"title": "Sit still", "invitation": "Take five quiet minutes."}}"#;

/// Provider stand-in answering by prompt content
#[derive(Default)]
struct FakeProvider {
    fail_core: bool,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn failing_core() -> Self {
        Self {
            fail_core: true,
            ..Default::default()
        }
    }

    fn reply(content: &str) -> ChatReply {
        ChatReply {
            content: Some(content.to_string()),
            finish_reason: Some("stop".to_string()),
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }),
        }
    }
}

#[async_trait]
impl ChatBackend for FakeProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt;

        if prompt.contains("encouraging_verse") {
            return Ok(Self::reply(VERSE));
        }
        if prompt.contains("invitation_to_growth") {
            return Ok(Self::reply(INVITATION));
        }
        if prompt.contains("\"theme\"") {
            return Ok(Self::reply(r#"{"theme": "\"Patient Love\" always"}"#));
        }
        if self.fail_core {
            return Err(BackendError::Status {
                status: 500,
                message: "The server had an error".to_string(),
            });
        }
        if prompt.contains("one_line_summaries") {
            return Ok(Self::reply(DAY1_CORE));
        }
        Ok(Self::reply(STANDARD_CORE))
    }
}

#[async_trait]
impl SpeechToText for FakeProvider {
    async fn transcribe(&self, audio: Vec<u8>, _file_name: &str) -> Result<String, BackendError> {
        Ok(format!("heard {} bytes", audio.len()))
    }
}

async fn context_with(provider: Option<Arc<FakeProvider>>) -> AppContext {
    let chat = provider.clone().map(|p| p as Arc<dyn ChatBackend>);
    let speech = provider.map(|p| p as Arc<dyn SpeechToText>);
    AppContext::from_parts(ServerConfig::for_testing(), memory_pool().await.unwrap(), chat, speech)
        .unwrap()
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn seed_journals(ctx: &AppContext, user_id: &str, count: usize) -> Vec<String> {
    let base = Utc::now() - Duration::days(30);
    let mut ids = Vec::new();
    for i in 0..count {
        let entry = ctx
            .journals
            .create(user_id, &format!("Journal {}", i + 1), None, None, base + Duration::days(i as i64))
            .await
            .unwrap();
        ids.push(entry.id);
    }
    ids
}

#[tokio::test]
async fn test_generate_mirror_end_to_end() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    ctx.users.create("u1", None, Some("Book Club")).await.unwrap();
    let ids = seed_journals(&ctx, "u1", 10).await;

    let (status, body) = post(
        build_router(ctx.clone()),
        "/generate-mirror",
        json!({"customUserId": "u1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["journalsUsed"], 10);
    assert_eq!(body["mirror"]["journal_count"], 10);
    assert_eq!(
        body["mirror"]["screen_2_biblical"]["encouraging_verse"]["reference"],
        "Psalm 46:10"
    );

    let mirror_id = body["mirror"]["id"].as_str().unwrap().to_string();
    for id in ids {
        let journal = ctx.journals.get(&id).await.unwrap().unwrap();
        assert_eq!(journal.mirror_id.as_deref(), Some(mirror_id.as_str()));
    }

    let requests = GenerationRequestStore::new(ctx.db.clone())
        .list_for_user("u1")
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].status, GenerationStatus::Completed);
}

#[tokio::test]
async fn test_generate_mirror_below_threshold() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    seed_journals(&ctx, "u1", 4).await;

    let (status, body) = post(
        build_router(ctx.clone()),
        "/generate-mirror",
        json!({"customUserId": "u1"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "Need at least 10 journals for Mirror generation. Currently have 4."
        })
    );
    assert!(GenerationRequestStore::new(ctx.db.clone())
        .list_for_user("u1")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_generate_mirror_core_failure_reports_taxonomy() {
    let provider = Arc::new(FakeProvider::failing_core());
    let ctx = context_with(Some(provider.clone())).await;
    ctx.users.create("u1", None, Some("Mens Group")).await.unwrap();
    seed_journals(&ctx, "u1", 6).await;

    let (status, body) = post(
        build_router(ctx.clone()),
        "/generate-mirror",
        json!({"customUserId": "u1"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorType"], "api_error");
    assert!(body["error"].as_str().unwrap().contains("The server had an error"));
    assert!(body["timestamp"].is_string());
    // two attempts of three calls each
    assert_eq!(provider.calls.load(Ordering::SeqCst), 6);

    let requests = GenerationRequestStore::new(ctx.db.clone())
        .list_for_user("u1")
        .await
        .unwrap();
    assert_eq!(requests[0].status, GenerationStatus::Failed);
}

#[tokio::test]
async fn test_generate_mirror_rejects_missing_user_id() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    let (status, body) = post(build_router(ctx), "/generate-mirror", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_generate_mirror_without_provider() {
    let ctx = context_with(None).await;
    seed_journals(&ctx, "u1", 10).await;

    let (status, body) = post(
        build_router(ctx),
        "/generate-mirror",
        json!({"customUserId": "u1"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorType"], "configuration_error");
}

#[tokio::test]
async fn test_generate_day1_mirror() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    let first = ctx
        .journals
        .create("u1", "I feel far from God.", None, Some(TranscriptionStatus::Completed), Utc::now())
        .await
        .unwrap();
    let second = ctx
        .journals
        .create("u1", "I want to start again.", None, Some(TranscriptionStatus::Completed), Utc::now())
        .await
        .unwrap();
    let day1 = Day1ProgressStore::new(ctx.db.clone());
    day1.upsert("u1", Some(SpiritualPlace::Wandering), Some(&first.id), Some(&second.id), 2)
        .await
        .unwrap();

    let (status, body) = post(
        build_router(ctx.clone()),
        "/generate-day-1-mirror",
        json!({"userId": "u1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summaries"].as_array().unwrap().len(), 2);
    assert_eq!(body["mirror"]["mirror_type"], "day_1");
    assert_eq!(body["mirror"]["journal_count"], 2);

    let progress = day1.get("u1").await.unwrap().unwrap();
    assert_eq!(progress.current_step, 3);
    assert_eq!(progress.mini_mirror_id.as_deref(), body["mirror"]["id"].as_str());
}

#[tokio::test]
async fn test_generate_day1_mirror_precondition_is_500() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;

    let (status, body) = post(
        build_router(ctx),
        "/generate-day-1-mirror",
        json!({"userId": "nobody"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Day 1 progress not found"));
}

#[tokio::test]
async fn test_onboarding_preview() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;

    let (status, body) = post(
        build_router(ctx),
        "/generate-onboarding-preview",
        json!({"journalContent": "Work has been heavy and I keep praying for patience."}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["content"]["biblical"]["parallel_story"]["character"], "Joseph");
}

#[tokio::test]
async fn test_onboarding_preview_failure_serves_fallback() {
    let ctx = context_with(Some(Arc::new(FakeProvider::failing_core()))).await;

    let (status, body) = post(
        build_router(ctx),
        "/generate-onboarding-preview",
        json!({"journalContent": "Some thoughts."}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert!(body["fallback"]["themes"].is_object());
    assert!(body["fallback"]["biblical"]["parallel_story"].is_object());
}

#[tokio::test]
async fn test_extract_focus_theme() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    let (status, body) = post(
        build_router(ctx),
        "/extract-focus-theme",
        json!({"focusText": "loving my wife patiently"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "theme": "Patient Love"}));
}

#[tokio::test]
async fn test_extract_focus_theme_without_provider() {
    let ctx = context_with(None).await;
    let (status, body) = post(
        build_router(ctx),
        "/extract-focus-theme",
        json!({"focusText": "anything"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], "Growth");
}

async fn context_with_quota(provider: Arc<FakeProvider>, per_minute: u32) -> AppContext {
    let mut config = ServerConfig::for_testing();
    config.rate_limit.enabled = true;
    config.rate_limit.generation_requests_per_minute = per_minute;
    let chat = provider.clone() as Arc<dyn ChatBackend>;
    let speech = provider as Arc<dyn SpeechToText>;
    AppContext::from_parts(config, memory_pool().await.unwrap(), Some(chat), Some(speech)).unwrap()
}

#[tokio::test]
async fn test_onboarding_preview_over_quota_serves_fallback() {
    let provider = Arc::new(FakeProvider::default());
    let app = build_router(context_with_quota(provider.clone(), 1).await);
    let request = json!({"journalContent": "Work has been heavy."});

    let (status, body) = post(app.clone(), "/generate-onboarding-preview", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let calls_after_first = provider.calls.load(Ordering::SeqCst);

    let (status, body) = post(app, "/generate-onboarding-preview", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert!(body["fallback"]["themes"].is_object());
    assert_eq!(provider.calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn test_extract_focus_theme_over_quota_serves_fallback() {
    let provider = Arc::new(FakeProvider::default());
    let app = build_router(context_with_quota(provider.clone(), 1).await);
    let request = json!({"focusText": "loving my wife patiently"});

    let (status, body) = post(app.clone(), "/extract-focus-theme", request.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["theme"], "Patient Love");

    let (status, body) = post(app, "/extract-focus-theme", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "theme": "Growth"}));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_transcribe_audio() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    let (status, body) = post(
        build_router(ctx),
        "/transcribe-audio",
        json!({"audioBase64": "aGVsbG8="}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "text": "heard 5 bytes"}));
}

#[tokio::test]
async fn test_transcribe_audio_bad_payload() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    let (status, body) = post(
        build_router(ctx),
        "/transcribe-audio",
        json!({"audioBase64": "%%%"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_send_push_notification() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/push")
        .match_body(mockito::Matcher::PartialJson(json!({
            "to": "ExponentPushToken[abc]",
            "title": "Hello",
            "data": {"screen": "mirror"}
        })))
        .with_status(200)
        .with_body(r#"{"data": {"status": "ok"}}"#)
        .create_async()
        .await;

    let mut config = ServerConfig::for_testing();
    config.push.gateway_url = format!("{}/push", server.url());
    let ctx = AppContext::from_parts(config, memory_pool().await.unwrap(), None, None).unwrap();
    ctx.users.create("u1", None, None).await.unwrap();
    ctx.users.set_push_token("u1", Some("ExponentPushToken[abc]")).await.unwrap();
    ctx.users.create("u2", None, None).await.unwrap();

    let app = build_router(ctx);
    let payload = |user: &str| {
        json!({"userId": user, "title": "Hello", "body": "Your Mirror is ready", "data": {"screen": "mirror"}})
    };

    let (status, body) = post(app.clone(), "/send-push-notification", payload("u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    mock.assert_async().await;

    let (status, _) = post(app.clone(), "/send-push-notification", payload("u2")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(app, "/send-push-notification", payload("missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wednesday_reminder_trigger_returns_summary() {
    let ctx = context_with(None).await;
    let (status, body) = post(build_router(ctx), "/wednesday-journal-reminder", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["isWednesday"].is_boolean());
    assert_eq!(body["sent"], 0);
}

#[tokio::test]
async fn test_cors_preflight() {
    let ctx = context_with(None).await;
    let response = build_router(ctx)
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/generate-mirror")
                .header(header::ORIGIN, "http://localhost:8081")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let ctx = context_with(None).await;
    let response = build_router(ctx)
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let ctx = context_with(Some(Arc::new(FakeProvider::default()))).await;
    let app = build_router(ctx);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("http_requests_total"));
}
