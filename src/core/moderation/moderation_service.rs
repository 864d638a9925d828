// Moderation service - the synchronous submission decision, manual
// moderator actions, and the deferred approval sweep.
//
// This service handles:
// - Classifying submitted content (via the sensitivity classifier)
// - Combining severity + trust tier + timing into approve/queue/reject
// - Keeping the trust ledger in step with every terminal outcome
// - The periodic sweep that promotes cooled-off pending comments
//
// NO storage dependencies here - just pure domain logic over the ports.

use super::moderation_models::{
    Comment, CommentStatus, ModerationAction, ModerationConfig, ModerationOutcome, NewComment,
    SweepReport,
};
use crate::core::classifier::{SensitivityClassifier, SensitivityLevel};
use crate::core::trust::{TrustError, TrustLedger, TrustStore, UserTrustRecord};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Comment {0} not found")]
    CommentNotFound(i64),

    #[error("Comment {id} is already {status} and cannot be moderated again")]
    AlreadyModerated { id: i64, status: CommentStatus },

    #[error(transparent)]
    Trust(#[from] TrustError),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting comments together with the trust counters they move.
///
/// A comment's status and its author's counters must never observably
/// diverge, so every status-changing write here is a single atomic unit:
/// either the comment row and the counter update both land, or neither
/// does. The SQLite adapter runs one transaction per call; the in-memory
/// adapter mutates both maps under the comment guard.
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persist a new comment with the status the decision engine picked.
    /// In the same unit, increment the author's comment_count, set
    /// last_comment_at, and increment approved_count when the comment
    /// lands Approved.
    async fn create_comment(
        &self,
        new: NewComment,
        status: CommentStatus,
        auto_approved: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Comment, ModerationError>;

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, ModerationError>;

    /// Flip a comment to Approved on a moderator's verdict, incrementing
    /// the author's approved_count in the same unit.
    async fn approve_comment(&self, id: i64) -> Result<(), ModerationError>;

    /// Flip a comment to Rejected. Rejections leave the counters alone.
    async fn reject_comment(&self, id: i64) -> Result<(), ModerationError>;

    /// Flip a comment to Approved only if it is still Pending, incrementing
    /// the author's approved_count in the same unit.
    ///
    /// Returns whether the write landed. The compare-and-swap keeps a
    /// concurrent manual rejection from being silently reverted by the sweep.
    async fn promote_if_pending(&self, id: i64) -> Result<bool, ModerationError>;

    /// Pending, not-auto-approved comments created at or after `since`,
    /// oldest first.
    async fn find_pending_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Comment>, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The moderation pipeline: decision engine + sweep over injected stores.
pub struct ModerationService<C: CommentStore, T: TrustStore> {
    comments: C,
    ledger: TrustLedger<T>,
    classifier: SensitivityClassifier,
    config: ModerationConfig,
}

impl<C: CommentStore, T: TrustStore> ModerationService<C, T> {
    pub fn new(comments: C, ledger: TrustLedger<T>) -> Self {
        Self {
            comments,
            ledger,
            classifier: SensitivityClassifier::default(),
            config: ModerationConfig::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: SensitivityClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_config(mut self, config: ModerationConfig) -> Self {
        self.config = config;
        self
    }

    /// The synchronous decision for one submission.
    ///
    /// Check order (the rate-limit guard deliberately outranks trust, so even
    /// Trusted users get queued when posting too fast):
    /// 1. Extreme severity rejects, High queues.
    /// 2. Posting again within the spacing window queues.
    /// 3. Trusted: approve iff Safe.
    /// 4. First-ever comment: approve iff Safe.
    /// 5. Regular: approve iff Safe and approval ratio clears the bar.
    /// 6. Everyone else queues.
    pub fn decide(
        &self,
        level: SensitivityLevel,
        snapshot: &UserTrustRecord,
        now: DateTime<Utc>,
    ) -> ModerationOutcome {
        use crate::core::trust::TrustLevel;

        if level == SensitivityLevel::Extreme {
            return ModerationOutcome::Reject;
        }
        if level == SensitivityLevel::High {
            return ModerationOutcome::Queue;
        }

        if let Some(last) = snapshot.last_comment_at {
            let spacing = Duration::seconds(self.config.min_seconds_between_comments);
            if now.signed_duration_since(last) < spacing {
                return ModerationOutcome::Queue;
            }
        }

        if snapshot.trust_level == TrustLevel::Trusted {
            return if level.is_safe() {
                ModerationOutcome::Approve
            } else {
                ModerationOutcome::Queue
            };
        }

        if snapshot.comment_count == 0 {
            return if level.is_safe() {
                ModerationOutcome::Approve
            } else {
                ModerationOutcome::Queue
            };
        }

        if snapshot.trust_level == TrustLevel::Regular {
            return if level.is_safe()
                && snapshot.approval_ratio() > self.config.regular_min_approval_ratio
            {
                ModerationOutcome::Approve
            } else {
                ModerationOutcome::Queue
            };
        }

        ModerationOutcome::Queue
    }

    /// Submit a comment: classify, decide, persist, update the ledger.
    ///
    /// Always returns a comment with a definite status - there is no async
    /// "processing" state at submission time. The comment row and the
    /// author's counters are one atomic store unit, so a storage failure
    /// aborts the whole submission with nothing persisted.
    pub async fn submit_comment(&self, new: NewComment) -> Result<Comment, ModerationError> {
        let now = Utc::now();
        let user_id = new.user_id.clone();

        let result = self.classifier.classify(&new.content);
        let snapshot = self.ledger.snapshot(&user_id).await?;
        let outcome = self.decide(result.level, &snapshot, now);

        tracing::debug!(
            user_id = %user_id,
            post_id = new.post_id,
            severity = %result.level,
            trust_level = %snapshot.trust_level,
            outcome = %outcome,
            matched_terms = result.matched_terms.len(),
            "Comment submission decided"
        );

        let (status, auto_approved) = match outcome {
            ModerationOutcome::Approve => (CommentStatus::Approved, true),
            ModerationOutcome::Queue => (CommentStatus::Pending, false),
            ModerationOutcome::Reject => (CommentStatus::Rejected, false),
        };

        let comment = self
            .comments
            .create_comment(new, status, auto_approved, now)
            .await?;

        if status == CommentStatus::Approved {
            self.refresh_tier(&user_id).await;
        }

        Ok(comment)
    }

    /// Apply a human moderator's verdict to a pending comment.
    ///
    /// Approved and Rejected comments are immutable - re-moderating one is an
    /// error. Only an approval touches the ledger; a rejection leaves
    /// approved_count alone.
    pub async fn moderate(
        &self,
        comment_id: i64,
        action: ModerationAction,
    ) -> Result<(), ModerationError> {
        let comment = self
            .comments
            .get_comment(comment_id)
            .await?
            .ok_or(ModerationError::CommentNotFound(comment_id))?;

        if comment.status != CommentStatus::Pending {
            return Err(ModerationError::AlreadyModerated {
                id: comment_id,
                status: comment.status,
            });
        }

        match action {
            ModerationAction::Approve => {
                self.comments.approve_comment(comment_id).await?;
                self.refresh_tier(&comment.user_id).await;
                tracing::info!(comment_id, user_id = %comment.user_id, "Comment approved by moderator");
            }
            ModerationAction::Reject => {
                self.comments.reject_comment(comment_id).await?;
                tracing::info!(comment_id, user_id = %comment.user_id, "Comment rejected by moderator");
            }
        }

        Ok(())
    }

    /// Re-evaluate queued comments and promote the ones that cooled off.
    ///
    /// A failure on one comment is logged and counted but never aborts the
    /// rest of the batch. Safe to run concurrently with itself or with
    /// manual moderation - promotion is a compare-and-swap on Pending, and
    /// a failed promotion leaves the row Pending for the next run.
    pub async fn run_approval_sweep(&self) -> Result<SweepReport, ModerationError> {
        let now = Utc::now();
        let window_start = now - Duration::hours(self.config.sweep_window_hours);
        let candidates = self.comments.find_pending_since(window_start).await?;

        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for comment in &candidates {
            match self.sweep_one(comment, now).await {
                Ok(true) => report.promoted += 1,
                Ok(false) => {}
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        comment_id = comment.id,
                        user_id = %comment.user_id,
                        error = %err,
                        "Sweep failed for comment, continuing"
                    );
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            promoted = report.promoted,
            failed = report.failed,
            "Approval sweep finished"
        );

        Ok(report)
    }

    /// Decide one sweep candidate. Promotes iff the comment aged past the
    /// cooling-off window, re-classifies as Safe, and the author's approval
    /// ratio clears the bar.
    async fn sweep_one(
        &self,
        comment: &Comment,
        now: DateTime<Utc>,
    ) -> Result<bool, ModerationError> {
        let cooling_off = Duration::seconds(self.config.sweep_cooling_off_secs);
        if now.signed_duration_since(comment.created_at) <= cooling_off {
            return Ok(false);
        }

        let result = self.classifier.classify(&comment.content);
        if !result.level.is_safe() {
            return Ok(false);
        }

        let snapshot = self.ledger.snapshot(&comment.user_id).await?;
        if snapshot.approval_ratio() <= self.config.sweep_min_approval_ratio {
            return Ok(false);
        }

        if !self.comments.promote_if_pending(comment.id).await? {
            // Lost the race to a moderator or a concurrent sweep.
            tracing::debug!(comment_id = comment.id, "Sweep promotion skipped, row no longer pending");
            return Ok(false);
        }

        self.refresh_tier(&comment.user_id).await;
        tracing::info!(
            comment_id = comment.id,
            user_id = %comment.user_id,
            "Pending comment promoted by sweep"
        );
        Ok(true)
    }

    /// Re-derive the author's tier after an approval landed. The counters
    /// are already consistent at this point; a failed recompute only leaves
    /// the stored tier stale, and the next approval repairs it (tiers are
    /// monotonic and fully derived from the counters).
    async fn refresh_tier(&self, user_id: &str) {
        if let Err(err) = self.ledger.recompute(user_id).await {
            tracing::warn!(user_id = %user_id, error = %err, "Trust tier recompute failed");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
