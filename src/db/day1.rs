/// Day 1 onboarding progress
use crate::{
    db::models::{Day1Progress, GenerationStatus, SpiritualPlace},
    error::OxbowResult,
};
use chrono::Utc;
use sqlx::SqlitePool;

/// Step recorded once the mini-Mirror exists
pub const DAY1_FINAL_STEP: i64 = 3;

/// Day 1 progress store
#[derive(Clone)]
pub struct Day1ProgressStore {
    db: SqlitePool,
}

impl Day1ProgressStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: &str) -> OxbowResult<Option<Day1Progress>> {
        let progress = sqlx::query_as::<_, Day1Progress>(
            r#"
            SELECT user_id, spiritual_place, journal_1_id, journal_2_id, mini_mirror_id,
                   current_step, generation_status, updated_at
            FROM day1_progress
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(progress)
    }

    /// Create or replace the onboarding row as the app advances through the steps
    pub async fn upsert(
        &self,
        user_id: &str,
        spiritual_place: Option<SpiritualPlace>,
        journal_1_id: Option<&str>,
        journal_2_id: Option<&str>,
        current_step: i64,
    ) -> OxbowResult<()> {
        sqlx::query(
            r#"
            INSERT INTO day1_progress (user_id, spiritual_place, journal_1_id, journal_2_id, current_step, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                spiritual_place = excluded.spiritual_place,
                journal_1_id = excluded.journal_1_id,
                journal_2_id = excluded.journal_2_id,
                current_step = excluded.current_step,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(spiritual_place)
        .bind(journal_1_id)
        .bind(journal_2_id)
        .bind(current_step)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Record the mini-Mirror and move to the final step
    pub async fn complete(&self, user_id: &str, mini_mirror_id: &str) -> OxbowResult<()> {
        sqlx::query(
            r#"
            UPDATE day1_progress
            SET mini_mirror_id = ?, current_step = ?, generation_status = ?, updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(mini_mirror_id)
        .bind(DAY1_FINAL_STEP)
        .bind(GenerationStatus::Completed)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn mark_failed(&self, user_id: &str) -> OxbowResult<()> {
        sqlx::query(
            r#"
            UPDATE day1_progress
            SET generation_status = ?, updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(GenerationStatus::Failed)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
