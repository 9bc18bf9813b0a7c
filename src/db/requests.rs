/// Generation request audit trail
///
/// One row per standard Mirror attempt: written as `processing` before any
/// LLM call and finalised exactly once. It is an audit record, not a lock.
use crate::{
    db::models::{GenerationRequest, GenerationStatus},
    error::{OxbowError, OxbowResult},
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Generation request store
#[derive(Clone)]
pub struct GenerationRequestStore {
    db: SqlitePool,
}

impl GenerationRequestStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open a `processing` request for `user_id`
    pub async fn start(&self, user_id: &str) -> OxbowResult<GenerationRequest> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO generation_requests (id, user_id, status, requested_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(GenerationStatus::Processing)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(GenerationRequest {
            id,
            user_id: user_id.to_string(),
            status: GenerationStatus::Processing,
            requested_at: now,
            completed_at: None,
            mirror_id: None,
            error_message: None,
        })
    }

    pub async fn mark_completed(&self, request_id: &str, mirror_id: &str) -> OxbowResult<()> {
        self.finish(request_id, GenerationStatus::Completed, Some(mirror_id), None)
            .await
    }

    pub async fn mark_failed(&self, request_id: &str, error_message: &str) -> OxbowResult<()> {
        self.finish(request_id, GenerationStatus::Failed, None, Some(error_message))
            .await
    }

    async fn finish(
        &self,
        request_id: &str,
        status: GenerationStatus,
        mirror_id: Option<&str>,
        error_message: Option<&str>,
    ) -> OxbowResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE generation_requests
            SET status = ?, completed_at = ?, mirror_id = ?, error_message = ?
            WHERE id = ? AND status = 'processing'
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(mirror_id)
        .bind(error_message)
        .bind(request_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OxbowError::NotFound(format!(
                "Processing generation request {}",
                request_id
            )));
        }

        Ok(())
    }

    /// Fail requests left `processing` since before `cutoff`
    ///
    /// A request only stays processing past its time budget if the process
    /// died mid-generation.
    pub async fn fail_stale(&self, cutoff: DateTime<Utc>) -> OxbowResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE generation_requests
            SET status = ?, completed_at = ?, error_message = ?
            WHERE status = 'processing' AND requested_at < ?
            "#,
        )
        .bind(GenerationStatus::Failed)
        .bind(Utc::now())
        .bind("Generation abandoned before completion")
        .bind(cutoff)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn get(&self, request_id: &str) -> OxbowResult<Option<GenerationRequest>> {
        let request = sqlx::query_as::<_, GenerationRequest>(
            r#"
            SELECT id, user_id, status, requested_at, completed_at, mirror_id, error_message
            FROM generation_requests
            WHERE id = ?
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(request)
    }

    pub async fn list_for_user(&self, user_id: &str) -> OxbowResult<Vec<GenerationRequest>> {
        let requests = sqlx::query_as::<_, GenerationRequest>(
            r#"
            SELECT id, user_id, status, requested_at, completed_at, mirror_id, error_message
            FROM generation_requests
            WHERE user_id = ?
            ORDER BY requested_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(requests)
    }
}
