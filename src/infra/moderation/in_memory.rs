// In-memory implementation of CommentStore.
//
// Useful for tests and for embedding the pipeline without a database.
// Follows the same patterns as the SQLite implementation so swapping
// stores never changes behavior. The trust counters live here too, so
// each status-changing write updates both maps as one unit; the matching
// read-side TrustStore is obtained via `trust_view()`.

use crate::core::moderation::{
    Comment, CommentStatus, CommentStore, ModerationError, NewComment,
};
use crate::core::trust::UserTrustRecord;
use crate::infra::trust::InMemoryTrustStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// In-memory comment store backed by concurrent maps.
pub struct InMemoryCommentStore {
    comments: DashMap<i64, Comment>,
    records: Arc<DashMap<String, UserTrustRecord>>,
    next_id: AtomicI64,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self {
            comments: DashMap::new(),
            records: Arc::new(DashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// A TrustStore over the same record map, for wiring a TrustLedger
    /// against this store.
    pub fn trust_view(&self) -> InMemoryTrustStore {
        InMemoryTrustStore::sharing(Arc::clone(&self.records))
    }
}

impl Default for InMemoryCommentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn create_comment(
        &self,
        new: NewComment,
        status: CommentStatus,
        auto_approved: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, ModerationError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let comment = Comment {
            id,
            post_id: new.post_id,
            user_id: new.user_id,
            parent_id: new.parent_id,
            reply_to_id: new.reply_to_id,
            content: new.content,
            status,
            auto_approved,
            created_at,
        };
        self.comments.insert(id, comment.clone());

        let mut record = self
            .records
            .entry(comment.user_id.clone())
            .or_insert_with(|| UserTrustRecord::empty(&comment.user_id));
        record.comment_count += 1;
        record.last_comment_at = Some(created_at);
        if status == CommentStatus::Approved {
            record.approved_count += 1;
        }

        Ok(comment)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, ModerationError> {
        Ok(self.comments.get(&id).map(|c| c.clone()))
    }

    async fn approve_comment(&self, id: i64) -> Result<(), ModerationError> {
        let mut comment = self
            .comments
            .get_mut(&id)
            .ok_or(ModerationError::CommentNotFound(id))?;
        // Move the counter before flipping the status; a missing record
        // leaves the comment untouched.
        match self.records.get_mut(&comment.user_id) {
            Some(mut record) => record.approved_count += 1,
            None => {
                return Err(ModerationError::StorageError(format!(
                    "no trust record for user {}",
                    comment.user_id
                )))
            }
        }
        comment.status = CommentStatus::Approved;
        comment.auto_approved = false;
        Ok(())
    }

    async fn reject_comment(&self, id: i64) -> Result<(), ModerationError> {
        match self.comments.get_mut(&id) {
            Some(mut comment) => {
                comment.status = CommentStatus::Rejected;
                comment.auto_approved = false;
                Ok(())
            }
            None => Err(ModerationError::CommentNotFound(id)),
        }
    }

    async fn promote_if_pending(&self, id: i64) -> Result<bool, ModerationError> {
        // The entry guard makes the check-and-set atomic, mirroring the
        // conditional UPDATE in the SQLite store.
        let Some(mut comment) = self.comments.get_mut(&id) else {
            return Ok(false);
        };
        if comment.status != CommentStatus::Pending {
            return Ok(false);
        }
        match self.records.get_mut(&comment.user_id) {
            Some(mut record) => record.approved_count += 1,
            None => {
                return Err(ModerationError::StorageError(format!(
                    "no trust record for user {}",
                    comment.user_id
                )))
            }
        }
        comment.status = CommentStatus::Approved;
        comment.auto_approved = true;
        Ok(true)
    }

    async fn find_pending_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Comment>, ModerationError> {
        let mut pending: Vec<Comment> = self
            .comments
            .iter()
            .filter(|entry| {
                entry.status == CommentStatus::Pending
                    && !entry.auto_approved
                    && entry.created_at >= since
            })
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by_key(|c| c.created_at);
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trust::TrustStore;
    use chrono::Duration;

    fn new_comment(user_id: &str, content: &str) -> NewComment {
        NewComment {
            post_id: 7,
            user_id: user_id.to_string(),
            parent_id: None,
            reply_to_id: None,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_fetch_round_trip() {
        let store = InMemoryCommentStore::new();
        let now = Utc::now();

        let created = store
            .create_comment(new_comment("alice", "hello"), CommentStatus::Pending, false, now)
            .await
            .unwrap();

        let fetched = store.get_comment(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, "alice");
        assert_eq!(fetched.status, CommentStatus::Pending);
        assert_eq!(fetched.created_at, now);
    }

    #[tokio::test]
    async fn create_moves_the_author_counters_in_the_same_unit() {
        let store = InMemoryCommentStore::new();
        let trust = store.trust_view();
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
        assert_eq!(record.last_comment_at, Some(now));
    }

    #[tokio::test]
    async fn approve_increments_counter_and_flips_status() {
        let store = InMemoryCommentStore::new();
        let trust = store.trust_view();
        let now = Utc::now();

        let pending = store
            .create_comment(new_comment("bob", "x"), CommentStatus::Pending, false, now)
            .await
            .unwrap();

        store.approve_comment(pending.id).await.unwrap();

        let comment = store.get_comment(pending.id).await.unwrap().unwrap();
        assert_eq!(comment.status, CommentStatus::Approved);
        assert!(!comment.auto_approved);
        let record = trust.get_record("bob").await.unwrap().unwrap();
        assert_eq!(record.approved_count, 1);
    }

    #[tokio::test]
    async fn reject_leaves_counters_alone() {
        let store = InMemoryCommentStore::new();
        let trust = store.trust_view();
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
    async fn promote_if_pending_is_conditional() {
        let store = InMemoryCommentStore::new();
        let trust = store.trust_view();
        let now = Utc::now();

        let pending = store
            .create_comment(new_comment("a", "x"), CommentStatus::Pending, false, now)
            .await
            .unwrap();
        let rejected = store
            .create_comment(new_comment("b", "y"), CommentStatus::Rejected, false, now)
            .await
            .unwrap();

        assert!(store.promote_if_pending(pending.id).await.unwrap());
        // Second promotion of the same row must not land.
        assert!(!store.promote_if_pending(pending.id).await.unwrap());
        // A rejected row is never flipped back.
        assert!(!store.promote_if_pending(rejected.id).await.unwrap());
        assert_eq!(
            store.get_comment(rejected.id).await.unwrap().unwrap().status,
            CommentStatus::Rejected
        );

        // Exactly one approval counted for the promoted comment, none for
        // the rejected one.
        assert_eq!(trust.get_record("a").await.unwrap().unwrap().approved_count, 1);
        assert_eq!(trust.get_record("b").await.unwrap().unwrap().approved_count, 0);
    }

    #[tokio::test]
    async fn find_pending_since_filters_and_sorts() {
        let store = InMemoryCommentStore::new();
        let now = Utc::now();

        let old = store
            .create_comment(
                new_comment("a", "old"),
                CommentStatus::Pending,
                false,
                now - Duration::hours(30),
            )
            .await
            .unwrap();
        let recent = store
            .create_comment(
                new_comment("b", "recent"),
                CommentStatus::Pending,
                false,
                now - Duration::minutes(40),
            )
            .await
            .unwrap();
        let newer = store
            .create_comment(
                new_comment("c", "newer"),
                CommentStatus::Pending,
                false,
                now - Duration::minutes(5),
            )
            .await
            .unwrap();
        store
            .create_comment(new_comment("d", "approved"), CommentStatus::Approved, true, now)
            .await
            .unwrap();

        let found = store
            .find_pending_since(now - Duration::hours(24))
            .await
            .unwrap();

        let ids: Vec<i64> = found.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![recent.id, newer.id]);
        assert!(!ids.contains(&old.id));
    }
}
