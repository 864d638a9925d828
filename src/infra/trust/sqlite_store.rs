// SQLite-backed trust store.
//
// Tables:
// - user_trust: per-user comment/approval counters and derived trust level
//
// The counters are written by SqliteCommentStore, in the same transaction
// as the comment row they belong to. This store owns the table's schema,
// reads the records back, and persists the tiers the ledger derives.

use crate::core::trust::{TrustError, TrustLevel, TrustStore, UserTrustRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteTrustStore {
    pool: Pool<Sqlite>,
}

impl SqliteTrustStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), TrustError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_trust (
                user_id TEXT PRIMARY KEY,
                comment_count INTEGER NOT NULL DEFAULT 0,
                approved_count INTEGER NOT NULL DEFAULT 0,
                last_comment_at TEXT,
                trust_level TEXT NOT NULL DEFAULT 'new'
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TrustError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl TrustStore for SqliteTrustStore {
    async fn get_record(&self, user_id: &str) -> Result<Option<UserTrustRecord>, TrustError> {
        let row = sqlx::query("SELECT * FROM user_trust WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TrustError::StorageError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let last_comment_at: Option<String> = row.get("last_comment_at");
        let last_comment_at = match last_comment_at {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        TrustError::StorageError(format!("Bad last_comment_at timestamp: {}", e))
                    })?,
            ),
            None => None,
        };

        let level_str: String = row.get("trust_level");
        let trust_level = TrustLevel::parse(&level_str).ok_or_else(|| {
            TrustError::StorageError(format!("Unknown trust level '{}'", level_str))
        })?;

        Ok(Some(UserTrustRecord {
            user_id: row.get("user_id"),
            comment_count: row.get::<i64, _>("comment_count") as u64,
            approved_count: row.get::<i64, _>("approved_count") as u64,
            last_comment_at,
            trust_level,
        }))
    }

    async fn set_trust_level(&self, user_id: &str, level: TrustLevel) -> Result<(), TrustError> {
        let result = sqlx::query("UPDATE user_trust SET trust_level = ? WHERE user_id = ?")
            .bind(level.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TrustError::StorageError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(TrustError::NotFound(user_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{CommentStatus, CommentStore, NewComment};
    use crate::infra::moderation::SqliteCommentStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn stores_in_tempdir() -> (tempfile::TempDir, SqliteTrustStore, SqliteCommentStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.db");
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        let store = SqliteTrustStore::new(pool.clone());
        store.migrate().await.unwrap();
        let comments = SqliteCommentStore::new(pool);
        comments.migrate().await.unwrap();
        (dir, store, comments)
    }

    fn new_comment(user_id: &str) -> NewComment {
        NewComment {
            post_id: 1,
            user_id: user_id.to_string(),
            parent_id: None,
            reply_to_id: None,
            content: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn reads_counters_written_by_the_comment_store() {
        let (_dir, store, comments) = stores_in_tempdir().await;
        let now = Utc::now();

        comments
            .create_comment(new_comment("alice"), CommentStatus::Pending, false, now)
            .await
            .unwrap();
        comments
            .create_comment(new_comment("alice"), CommentStatus::Approved, true, now)
            .await
            .unwrap();

        let record = store.get_record("alice").await.unwrap().unwrap();
        assert_eq!(record.comment_count, 2);
        assert_eq!(record.approved_count, 1);
        assert!(record.last_comment_at.is_some());
        assert_eq!(record.trust_level, TrustLevel::New);
    }

    #[tokio::test]
    async fn trust_level_round_trips() {
        let (_dir, store, comments) = stores_in_tempdir().await;
        comments
            .create_comment(new_comment("carol"), CommentStatus::Pending, false, Utc::now())
            .await
            .unwrap();

        store
            .set_trust_level("carol", TrustLevel::Trusted)
            .await
            .unwrap();

        let record = store.get_record("carol").await.unwrap().unwrap();
        assert_eq!(record.trust_level, TrustLevel::Trusted);
    }

    #[tokio::test]
    async fn setting_a_level_requires_an_existing_record() {
        let (_dir, store, _comments) = stores_in_tempdir().await;
        let err = store
            .set_trust_level("ghost", TrustLevel::Trusted)
            .await
            .unwrap_err();
        assert!(matches!(err, TrustError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let (_dir, store, _comments) = stores_in_tempdir().await;
        assert!(store.get_record("nobody").await.unwrap().is_none());
    }
}
