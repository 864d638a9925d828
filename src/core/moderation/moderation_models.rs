// Moderation domain models - data structures for the comment pipeline.
//
// These are pure domain types with no storage dependencies.
// The infra layer converts these to and from database rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a comment. Status transitions are the only mutation a
/// comment ever sees; Approved and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CommentStatus::Pending),
            "approved" => Some(CommentStatus::Approved),
            "rejected" => Some(CommentStatus::Rejected),
            _ => None,
        }
    }
}

/// A persisted comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: String,
    /// Parent comment for threaded replies.
    pub parent_id: Option<i64>,
    /// The specific comment this one replies to (may differ from the thread
    /// parent in deep threads).
    pub reply_to_id: Option<i64>,
    pub content: String,
    pub status: CommentStatus,
    /// True when the decision engine or the sweep approved it; false for
    /// human approvals.
    pub auto_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when submitting a comment. The store
/// assigns the id, status and timestamp.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: String,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub content: String,
}

/// The synchronous decision made at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationOutcome {
    /// Publish immediately (status Approved, auto_approved = true).
    Approve,
    /// Hold for human review or the deferred sweep (status Pending).
    Queue,
    /// Reject outright (status Rejected). Only Extreme severity reaches
    /// this arm, and the classifier currently never emits Extreme.
    Reject,
}

impl std::fmt::Display for ModerationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModerationOutcome::Approve => write!(f, "approve"),
            ModerationOutcome::Queue => write!(f, "queue"),
            ModerationOutcome::Reject => write!(f, "reject"),
        }
    }
}

/// A human moderator's verdict on a pending comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject,
}

/// Timing and ratio knobs for the decision engine and the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Minimum spacing between comments before the queue guard fires.
    pub min_seconds_between_comments: i64,
    /// Approval ratio a Regular user needs for auto-approval.
    pub regular_min_approval_ratio: f64,
    /// Cooling-off before a pending comment becomes sweep-eligible.
    pub sweep_cooling_off_secs: i64,
    /// Pending comments older than this are left for manual moderation.
    pub sweep_window_hours: i64,
    /// Approval ratio the author needs for sweep promotion.
    pub sweep_min_approval_ratio: f64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            min_seconds_between_comments: 300, // 5 minutes between comments
            regular_min_approval_ratio: 0.8,
            sweep_cooling_off_secs: 1800,      // 30 minute cooling-off
            sweep_window_hours: 24,            // sweep looks back one day
            sweep_min_approval_ratio: 0.8,
        }
    }
}

/// Outcome counts from one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub promoted: usize,
    pub failed: usize,
}
