/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db::{self, JournalStore, UserStore},
    error::{OxbowError, OxbowResult},
    llm::{ChatBackend, CompletionClient, OpenAiBackend, SpeechToText},
    mirror::MirrorService,
    push::PushClient,
    rate_limit::RateLimiter,
};
use sqlx::SqlitePool;
use std::{path::Path, sync::Arc};

/// Application context holding all shared services
///
/// Built once at startup and cloned into every handler and job. LLM-backed
/// services are absent when no provider key is configured.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: UserStore,
    pub journals: JournalStore,
    pub completion_client: Option<CompletionClient>,
    pub mirror_service: Option<Arc<MirrorService>>,
    pub speech: Option<Arc<dyn SpeechToText>>,
    pub push: Arc<PushClient>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> OxbowResult<Self> {
        config.validate()?;

        let db = if config.database.path == Path::new(":memory:") {
            db::memory_pool().await?
        } else {
            let pool = db::create_pool(
                &config.database.path,
                db::DatabaseOptions {
                    max_connections: config.database.max_connections,
                    ..Default::default()
                },
            )
            .await?;
            db::run_migrations(&pool).await?;
            pool
        };

        db::test_connection(&db).await?;

        let (chat, speech): (Option<Arc<dyn ChatBackend>>, Option<Arc<dyn SpeechToText>>) =
            match config.llm.api_key {
                Some(_) => {
                    let backend = Arc::new(OpenAiBackend::new(&config.llm)?);
                    tracing::info!(model = %config.llm.model, "LLM provider configured");
                    let chat: Arc<dyn ChatBackend> = backend.clone();
                    let speech: Arc<dyn SpeechToText> = backend;
                    (Some(chat), Some(speech))
                }
                None => {
                    tracing::warn!("OPENAI_API_KEY not set - generation and transcription disabled");
                    (None, None)
                }
            };

        Self::from_parts(config, db, chat, speech)
    }

    /// Assemble a context around existing collaborators
    pub fn from_parts(
        config: ServerConfig,
        db: SqlitePool,
        chat: Option<Arc<dyn ChatBackend>>,
        speech: Option<Arc<dyn SpeechToText>>,
    ) -> OxbowResult<Self> {
        let completion_client =
            chat.map(|backend| CompletionClient::new(backend, config.llm.max_output_tokens));

        let mirror_service = completion_client
            .clone()
            .map(|client| Arc::new(MirrorService::new(db.clone(), client, &config)));

        let push = Arc::new(PushClient::new(&config.push)?);
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Ok(Self {
            users: UserStore::new(db.clone()),
            journals: JournalStore::new(db.clone()),
            config: Arc::new(config),
            db,
            completion_client,
            mirror_service,
            speech,
            push,
            rate_limiter,
        })
    }

    /// Mirror service, or a configuration error when no provider is set up
    pub fn mirrors(&self) -> OxbowResult<&MirrorService> {
        self.mirror_service
            .as_deref()
            .ok_or_else(|| OxbowError::Configuration("LLM provider is not configured".to_string()))
    }

    pub fn llm_configured(&self) -> bool {
        self.completion_client.is_some()
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
