/// User lookups: cohort membership and push tokens
use crate::{db::models::User, error::OxbowResult};
use chrono::Utc;
use sqlx::SqlitePool;

/// User store
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: &str) -> OxbowResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, display_name, group_name, push_token, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    /// Insert a user row
    pub async fn create(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        group_name: Option<&str>,
    ) -> OxbowResult<User> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, group_name, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(group_name)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(User {
            id: user_id.to_string(),
            display_name: display_name.map(String::from),
            group_name: group_name.map(String::from),
            push_token: None,
            created_at: now,
        })
    }

    pub async fn set_push_token(&self, user_id: &str, token: Option<&str>) -> OxbowResult<bool> {
        let result = sqlx::query("UPDATE users SET push_token = ? WHERE id = ?")
            .bind(token)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Members of `group_name` who can receive pushes
    pub async fn list_group_with_push_tokens(&self, group_name: &str) -> OxbowResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, display_name, group_name, push_token, created_at
            FROM users
            WHERE group_name = ? AND push_token IS NOT NULL AND push_token != ''
            ORDER BY id
            "#,
        )
        .bind(group_name)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let store = UserStore::new(memory_pool().await.unwrap());

        store
            .create("user-1", Some("Sam"), Some("Mens Group"))
            .await
            .unwrap();

        let user = store.get("user-1").await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Sam"));
        assert_eq!(user.group_name.as_deref(), Some("Mens Group"));
        assert!(user.push_token.is_none());

        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_group_listing_requires_push_token() {
        let store = UserStore::new(memory_pool().await.unwrap());

        store.create("a", None, Some("Mens Group")).await.unwrap();
        store.create("b", None, Some("Mens Group")).await.unwrap();
        store.create("c", None, Some("Other")).await.unwrap();

        assert!(store.set_push_token("a", Some("ExponentPushToken[a]")).await.unwrap());
        assert!(store.set_push_token("c", Some("ExponentPushToken[c]")).await.unwrap());
        assert!(!store.set_push_token("nobody", Some("x")).await.unwrap());

        let members = store.list_group_with_push_tokens("Mens Group").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "a");
    }
}
