/// Mirror persistence
use crate::{
    db::models::{GenerationStatus, Mirror, NewMirror},
    error::OxbowResult,
};
use chrono::Utc;
use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

const MIRROR_COLUMNS: &str = "id, user_id, screen_1_themes, screen_2_biblical, \
     screen_3_observations, screen_4_suggestions, journal_count, status, mirror_type, \
     generation_started_at, generation_completed_at, created_at";

/// Mirror store
#[derive(Clone)]
pub struct MirrorStore {
    db: SqlitePool,
}

impl MirrorStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Save a completed Mirror
    ///
    /// Only finished Mirrors are written; the suggestions screen is always null.
    pub async fn insert_completed(&self, mirror: NewMirror) -> OxbowResult<Mirror> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO mirrors (
                id, user_id, screen_1_themes, screen_2_biblical, screen_3_observations,
                screen_4_suggestions, journal_count, status, mirror_type,
                generation_started_at, generation_completed_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&mirror.user_id)
        .bind(Json(&mirror.themes))
        .bind(Json(&mirror.biblical))
        .bind(mirror.observations.as_ref().map(Json))
        .bind(mirror.journal_count)
        .bind(GenerationStatus::Completed)
        .bind(mirror.mirror_type)
        .bind(mirror.generation_started_at)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Mirror {
            id,
            user_id: mirror.user_id,
            screen_1_themes: Json(mirror.themes),
            screen_2_biblical: Json(mirror.biblical),
            screen_3_observations: mirror.observations.map(Json),
            screen_4_suggestions: None,
            journal_count: mirror.journal_count,
            status: GenerationStatus::Completed,
            mirror_type: mirror.mirror_type,
            generation_started_at: mirror.generation_started_at,
            generation_completed_at: Some(now),
            created_at: now,
        })
    }

    pub async fn get(&self, id: &str) -> OxbowResult<Option<Mirror>> {
        let mirror = sqlx::query_as::<_, Mirror>(&format!(
            "SELECT {MIRROR_COLUMNS} FROM mirrors WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(mirror)
    }

    pub async fn list_for_user(&self, user_id: &str) -> OxbowResult<Vec<Mirror>> {
        let mirrors = sqlx::query_as::<_, Mirror>(&format!(
            "SELECT {MIRROR_COLUMNS} FROM mirrors WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(mirrors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_pool, models::MirrorType};
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = MirrorStore::new(memory_pool().await.unwrap());

        let saved = store
            .insert_completed(NewMirror {
                user_id: "u1".to_string(),
                themes: json!({"themes": [{"name": "Trust"}]}),
                biblical: json!({"parallel_story": {"character": "Ruth"}, "encouraging_verse": null}),
                observations: Some(json!({"patterns": []})),
                journal_count: 10,
                mirror_type: MirrorType::Standard,
                generation_started_at: Utc::now(),
            })
            .await
            .unwrap();

        let loaded = store.get(&saved.id).await.unwrap().unwrap();
        assert_eq!(loaded.journal_count, 10);
        assert_eq!(loaded.status, GenerationStatus::Completed);
        assert_eq!(loaded.mirror_type, MirrorType::Standard);
        assert_eq!(loaded.screen_1_themes.0["themes"][0]["name"], "Trust");
        assert!(loaded.screen_2_biblical.0["encouraging_verse"].is_null());
        assert!(loaded.screen_4_suggestions.is_none());
        assert!(loaded.generation_completed_at.is_some());

        let all = store.list_for_user("u1").await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_day1_mirror_without_observations() {
        let store = MirrorStore::new(memory_pool().await.unwrap());

        let saved = store
            .insert_completed(NewMirror {
                user_id: "u1".to_string(),
                themes: json!({"one_line_summaries": ["a", "b"]}),
                biblical: json!({"parallel_story": {}}),
                observations: None,
                journal_count: 2,
                mirror_type: MirrorType::Day1,
                generation_started_at: Utc::now(),
            })
            .await
            .unwrap();

        let (mirror_type,): (String,) =
            sqlx::query_as("SELECT mirror_type FROM mirrors WHERE id = ?")
                .bind(&saved.id)
                .fetch_one(&store.db)
                .await
                .unwrap();
        assert_eq!(mirror_type, "day_1");

        let loaded = store.get(&saved.id).await.unwrap().unwrap();
        assert!(loaded.screen_3_observations.is_none());
    }
}
