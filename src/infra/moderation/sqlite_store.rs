// SQLite-backed comment store.
//
// Tables:
// - comments: submitted comments with their moderation status
// - user_trust (written, not owned): the counters each write moves
//
// Every status-changing write runs as one transaction over the comment row
// and the author's user_trust counters, so the two can never observably
// diverge. The user_trust table is created by SqliteTrustStore::migrate();
// run both migrations before using this store.

use crate::core::moderation::{
    Comment, CommentStatus, CommentStore, ModerationError, NewComment,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteCommentStore {
    pool: Pool<Sqlite>,
}

impl SqliteCommentStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                user_id TEXT NOT NULL,
                parent_id INTEGER,
                reply_to_id INTEGER,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                auto_approved BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_comments_status_created
                ON comments(status, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> Result<Comment, ModerationError> {
        let status_str: String = row.get("status");
        let status = CommentStatus::parse(&status_str).ok_or_else(|| {
            ModerationError::StorageError(format!("Unknown comment status '{}'", status_str))
        })?;

        let created_at_str: String = row.get("created_at");
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                ModerationError::StorageError(format!("Bad created_at timestamp: {}", e))
            })?;

        Ok(Comment {
            id: row.get("id"),
            post_id: row.get("post_id"),
            user_id: row.get("user_id"),
            parent_id: row.get("parent_id"),
            reply_to_id: row.get("reply_to_id"),
            content: row.get("content"),
            status,
            auto_approved: row.get("auto_approved"),
            created_at,
        })
    }
}

fn storage(e: sqlx::Error) -> ModerationError {
    ModerationError::StorageError(e.to_string())
}

#[async_trait]
impl CommentStore for SqliteCommentStore {
    async fn create_comment(
        &self,
        new: NewComment,
        status: CommentStatus,
        auto_approved: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, ModerationError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, user_id, parent_id, reply_to_id, content, status, auto_approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.post_id)
        .bind(&new.user_id)
        .bind(new.parent_id)
        .bind(new.reply_to_id)
        .bind(&new.content)
        .bind(status.as_str())
        .bind(auto_approved)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        // Same unit as the insert: comment_count always moves,
        // approved_count only when the comment lands Approved.
        let approved = i64::from(status == CommentStatus::Approved);
        sqlx::query(
            r#"
            INSERT INTO user_trust (user_id, comment_count, approved_count, last_comment_at, trust_level)
            VALUES (?, 1, ?, ?, 'new')
            ON CONFLICT(user_id) DO UPDATE SET
                comment_count = comment_count + 1,
                approved_count = approved_count + excluded.approved_count,
                last_comment_at = excluded.last_comment_at
            "#,
        )
        .bind(&new.user_id)
        .bind(approved)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id: new.post_id,
            user_id: new.user_id,
            parent_id: new.parent_id,
            reply_to_id: new.reply_to_id,
            content: new.content,
            status,
            auto_approved,
            created_at,
        })
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, ModerationError> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => Ok(Some(Self::row_to_comment(&row)?)),
            None => Ok(None),
        }
    }

    async fn approve_comment(&self, id: i64) -> Result<(), ModerationError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query("SELECT user_id FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        let Some(row) = row else {
            return Err(ModerationError::CommentNotFound(id));
        };
        let user_id: String = row.get("user_id");

        sqlx::query("UPDATE comments SET status = 'approved', auto_approved = 0 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let result =
            sqlx::query("UPDATE user_trust SET approved_count = approved_count + 1 WHERE user_id = ?")
                .bind(&user_id)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls the status flip back.
            return Err(ModerationError::StorageError(format!(
                "no trust record for user {}",
                user_id
            )));
        }

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn reject_comment(&self, id: i64) -> Result<(), ModerationError> {
        let result =
            sqlx::query("UPDATE comments SET status = 'rejected', auto_approved = 0 WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(ModerationError::CommentNotFound(id));
        }
        Ok(())
    }

    async fn promote_if_pending(&self, id: i64) -> Result<bool, ModerationError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let row = sqlx::query("SELECT user_id FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        let Some(row) = row else {
            return Ok(false);
        };
        let user_id: String = row.get("user_id");

        // Conditional UPDATE: the row flips only if it is still pending, so a
        // concurrent moderator rejection always wins over the sweep.
        let result = sqlx::query(
            r#"
            UPDATE comments SET status = 'approved', auto_approved = 1
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let result =
            sqlx::query("UPDATE user_trust SET approved_count = approved_count + 1 WHERE user_id = ?")
                .bind(&user_id)
                .execute(&mut *tx)
                .await
                .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Err(ModerationError::StorageError(format!(
                "no trust record for user {}",
                user_id
            )));
        }

        tx.commit().await.map_err(storage)?;
        Ok(true)
    }

    async fn find_pending_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Comment>, ModerationError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM comments
            WHERE status = 'pending' AND auto_approved = 0 AND created_at >= ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(since.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in &rows {
            comments.push(Self::row_to_comment(row)?);
        }
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trust::TrustStore;
    use crate::infra::trust::SqliteTrustStore;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn stores_in_tempdir() -> (tempfile::TempDir, SqliteCommentStore, SqliteTrustStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.db");
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        let trust = SqliteTrustStore::new(pool.clone());
        trust.migrate().await.unwrap();
        let store = SqliteCommentStore::new(pool);
        store.migrate().await.unwrap();
        (dir, store, trust)
    }

    fn new_comment(user_id: &str, content: &str) -> NewComment {
        NewComment {
            post_id: 42,
            user_id: user_id.to_string(),
            parent_id: None,
            reply_to_id: Some(3),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn comments_round_trip_through_sqlite() {
        let (_dir, store, _trust) = stores_in_tempdir().await;
        let now = Utc::now();

        let created = store
            .create_comment(new_comment("alice", "hello there"), CommentStatus::Approved, true, now)
            .await
            .unwrap();

        let fetched = store.get_comment(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.post_id, 42);
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.reply_to_id, Some(3));
        assert_eq!(fetched.status, CommentStatus::Approved);
        assert!(fetched.auto_approved);
    }

    #[tokio::test]
    async fn create_moves_the_author_counters_in_the_same_unit() {
        let (_dir, store, trust) = stores_in_tempdir().await;
        let now = Utc::now();

        store
            .create_comment(new_comment("alice", "one"), CommentStatus::Pending, false, now)
            .await
            .unwrap();
        store
            .create_comment(new_comment("alice", "two"), CommentStatus::Approved, true, now)
            .await
            .unwrap();

        let record = trust.get_record("alice").await.unwrap().unwrap();
        assert_eq!(record.comment_count, 2);
        // Only the approved comment bumped approved_count.
        assert_eq!(record.approved_count, 1);
        assert!(record.last_comment_at.is_some());
    }

    #[tokio::test]
    async fn missing_comment_is_none() {
        let (_dir, store, _trust) = stores_in_tempdir().await;
        assert!(store.get_comment(12345).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn approve_increments_counter_and_flips_status() {
        let (_dir, store, trust) = stores_in_tempdir().await;
        let now = Utc::now();

        let pending = store
            .create_comment(new_comment("bob", "x"), CommentStatus::Pending, false, now)
            .await
            .unwrap();

        store.approve_comment(pending.id).await.unwrap();

        let comment = store.get_comment(pending.id).await.unwrap().unwrap();
        assert_eq!(comment.status, CommentStatus::Approved);
        // Human approval, not auto.
        assert!(!comment.auto_approved);
        let record = trust.get_record("bob").await.unwrap().unwrap();
        assert_eq!(record.approved_count, 1);
    }

    #[tokio::test]
    async fn reject_leaves_counters_alone() {
        let (_dir, store, trust) = stores_in_tempdir().await;
        let now = Utc::now();

        let pending = store
            .create_comment(new_comment("carol", "x"), CommentStatus::Pending, false, now)
            .await
            .unwrap();

        store.reject_comment(pending.id).await.unwrap();

        let comment = store.get_comment(pending.id).await.unwrap().unwrap();
        assert_eq!(comment.status, CommentStatus::Rejected);
        let record = trust.get_record("carol").await.unwrap().unwrap();
        assert_eq!(record.approved_count, 0);
    }

    #[tokio::test]
    async fn promote_if_pending_respects_terminal_states() {
        let (_dir, store, trust) = stores_in_tempdir().await;
        let now = Utc::now();

        let pending = store
            .create_comment(new_comment("a", "x"), CommentStatus::Pending, false, now)
            .await
            .unwrap();

        assert!(store.promote_if_pending(pending.id).await.unwrap());
        let promoted = store.get_comment(pending.id).await.unwrap().unwrap();
        assert_eq!(promoted.status, CommentStatus::Approved);
        assert!(promoted.auto_approved);

        // Already approved - the conditional write must not land again, and
        // the counter must not move twice.
        assert!(!store.promote_if_pending(pending.id).await.unwrap());
        let record = trust.get_record("a").await.unwrap().unwrap();
        assert_eq!(record.approved_count, 1);

        let rejected = store
            .create_comment(new_comment("b", "y"), CommentStatus::Rejected, false, now)
            .await
            .unwrap();
        assert!(!store.promote_if_pending(rejected.id).await.unwrap());
    }

    #[tokio::test]
    async fn pending_query_applies_window_and_order() {
        let (_dir, store, _trust) = stores_in_tempdir().await;
        let now = Utc::now();

        store
            .create_comment(
                new_comment("a", "too old"),
                CommentStatus::Pending,
                false,
                now - Duration::hours(30),
            )
            .await
            .unwrap();
        let second = store
            .create_comment(
                new_comment("b", "second"),
                CommentStatus::Pending,
                false,
                now - Duration::minutes(10),
            )
            .await
            .unwrap();
        let first = store
            .create_comment(
                new_comment("c", "first"),
                CommentStatus::Pending,
                false,
                now - Duration::minutes(50),
            )
            .await
            .unwrap();

        let found = store
            .find_pending_since(now - Duration::hours(24))
            .await
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn moderating_a_missing_comment_errors() {
        let (_dir, store, _trust) = stores_in_tempdir().await;

        let err = store.approve_comment(999).await.unwrap_err();
        assert!(matches!(err, ModerationError::CommentNotFound(999)));
        let err = store.reject_comment(999).await.unwrap_err();
        assert!(matches!(err, ModerationError::CommentNotFound(999)));
    }
}
