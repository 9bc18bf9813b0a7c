/// Journal entry access
///
/// Journals are written upstream; this layer only reads them and sets
/// `mirror_id` once their Mirror is saved.
use crate::{
    db::models::{JournalEntry, TranscriptionStatus},
    error::OxbowResult,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const JOURNAL_COLUMNS: &str =
    "id, user_id, content, prompt_text, transcription_status, mirror_id, created_at";

/// Journal store
#[derive(Clone)]
pub struct JournalStore {
    db: SqlitePool,
}

/// Outcome of linking journals to a Mirror
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub linked: usize,
    pub failed: Vec<String>,
}

impl JournalStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Insert a journal entry
    pub async fn create(
        &self,
        user_id: &str,
        content: &str,
        prompt_text: Option<&str>,
        transcription_status: Option<TranscriptionStatus>,
        created_at: DateTime<Utc>,
    ) -> OxbowResult<JournalEntry> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO journal_entries (id, user_id, content, prompt_text, transcription_status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(content)
        .bind(prompt_text)
        .bind(transcription_status)
        .bind(created_at)
        .execute(&self.db)
        .await?;

        Ok(JournalEntry {
            id,
            user_id: user_id.to_string(),
            content: content.to_string(),
            prompt_text: prompt_text.map(String::from),
            transcription_status,
            mirror_id: None,
            created_at,
        })
    }

    pub async fn get(&self, id: &str) -> OxbowResult<Option<JournalEntry>> {
        let entry = sqlx::query_as::<_, JournalEntry>(&format!(
            "SELECT {JOURNAL_COLUMNS} FROM journal_entries WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(entry)
    }

    /// Journals not yet consumed by any Mirror, oldest first
    pub async fn list_unassigned(&self, user_id: &str) -> OxbowResult<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(&format!(
            "SELECT {JOURNAL_COLUMNS} FROM journal_entries \
             WHERE user_id = ? AND mirror_id IS NULL \
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    /// Number of journals `user_id` wrote in `[start, end)`
    pub async fn count_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OxbowResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM journal_entries
            WHERE user_id = ? AND created_at >= ? AND created_at < ?
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Point each unlinked journal at `mirror_id`
    ///
    /// Rows are updated one by one so a bad row does not block the rest;
    /// per-row failures are reported, not raised. A journal already owned by
    /// another Mirror is left alone and reported as failed.
    pub async fn link_to_mirror(&self, journal_ids: &[String], mirror_id: &str) -> LinkReport {
        let mut report = LinkReport::default();

        for journal_id in journal_ids {
            let result = sqlx::query(
                "UPDATE journal_entries SET mirror_id = ? WHERE id = ? AND mirror_id IS NULL",
            )
            .bind(mirror_id)
            .bind(journal_id)
            .execute(&self.db)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => report.linked += 1,
                Ok(_) => {
                    tracing::warn!(journal_id = %journal_id, mirror_id = %mirror_id, "journal to link not found or already linked");
                    report.failed.push(journal_id.clone());
                }
                Err(e) => {
                    tracing::warn!(journal_id = %journal_id, mirror_id = %mirror_id, error = %e, "failed to link journal");
                    report.failed.push(journal_id.clone());
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use chrono::Duration;

    #[tokio::test]
    async fn test_list_unassigned_oldest_first() {
        let pool = memory_pool().await.unwrap();
        let store = JournalStore::new(pool.clone());
        let base = Utc::now();

        let newer = store
            .create("u1", "second", None, None, base)
            .await
            .unwrap();
        let older = store
            .create("u1", "first", Some("What are you grateful for?"), None, base - Duration::hours(1))
            .await
            .unwrap();
        store.create("u2", "other user", None, None, base).await.unwrap();

        let entries = store.list_unassigned("u1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, older.id);
        assert_eq!(entries[1].id, newer.id);
        assert_eq!(
            entries[0].prompt_text.as_deref(),
            Some("What are you grateful for?")
        );
    }

    #[tokio::test]
    async fn test_linked_journals_leave_backlog() {
        let pool = memory_pool().await.unwrap();
        let store = JournalStore::new(pool.clone());

        let a = store.create("u1", "a", None, None, Utc::now()).await.unwrap();
        let b = store.create("u1", "b", None, None, Utc::now()).await.unwrap();

        sqlx::query(
            "INSERT INTO mirrors (id, user_id, screen_1_themes, screen_2_biblical, journal_count, status, mirror_type, generation_started_at, created_at) \
             VALUES ('m1', 'u1', '{}', '{}', 1, 'completed', 'standard', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let report = store.link_to_mirror(&[a.id.clone()], "m1").await;
        assert_eq!(report.linked, 1);
        assert!(report.failed.is_empty());

        let remaining = store.list_unassigned("u1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);

        let linked = store.get(&a.id).await.unwrap().unwrap();
        assert_eq!(linked.mirror_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_link_reports_missing_rows() {
        let pool = memory_pool().await.unwrap();
        let store = JournalStore::new(pool);

        let report = store.link_to_mirror(&["ghost".to_string()], "m1").await;
        assert_eq!(report.linked, 0);
        assert_eq!(report.failed, vec!["ghost".to_string()]);
    }

    #[tokio::test]
    async fn test_link_never_moves_a_linked_journal() {
        let pool = memory_pool().await.unwrap();
        let store = JournalStore::new(pool.clone());
        let journal = store.create("u1", "j", None, None, Utc::now()).await.unwrap();

        for id in ["m1", "m2"] {
            sqlx::query(
                "INSERT INTO mirrors (id, user_id, screen_1_themes, screen_2_biblical, journal_count, status, mirror_type, generation_started_at, created_at) \
                 VALUES (?, 'u1', '{}', '{}', 1, 'completed', 'standard', '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
            )
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
        }

        let first = store.link_to_mirror(&[journal.id.clone()], "m1").await;
        assert_eq!(first.linked, 1);

        let second = store.link_to_mirror(&[journal.id.clone()], "m2").await;
        assert_eq!(second.linked, 0);
        assert_eq!(second.failed, vec![journal.id.clone()]);

        let stored = store.get(&journal.id).await.unwrap().unwrap();
        assert_eq!(stored.mirror_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_count_between() {
        let pool = memory_pool().await.unwrap();
        let store = JournalStore::new(pool);
        let now = Utc::now();

        store.create("u1", "today", None, None, now).await.unwrap();
        store
            .create("u1", "last week", None, None, now - Duration::days(7))
            .await
            .unwrap();

        let count = store
            .count_between("u1", now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
