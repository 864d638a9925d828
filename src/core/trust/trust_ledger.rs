// Trust ledger - per-user rolling comment/approval statistics and the
// trust tier derived from them.
//
// The tier gates how strictly the decision engine screens new comments.
// NO storage engine dependencies here - persistence goes through the
// TrustStore trait, same pattern as the comment store in moderation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Discrete user reputation level.
///
/// Ordered so the recompute can take `max(stored, derived)` - a tier only
/// ever upgrades, it is never implicitly downgraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    New,
    Regular,
    Trusted,
}

impl Default for TrustLevel {
    fn default() -> Self {
        TrustLevel::New
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustLevel::New => write!(f, "new"),
            TrustLevel::Regular => write!(f, "regular"),
            TrustLevel::Trusted => write!(f, "trusted"),
        }
    }
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::New => "new",
            TrustLevel::Regular => "regular",
            TrustLevel::Trusted => "trusted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(TrustLevel::New),
            "regular" => Some(TrustLevel::Regular),
            "trusted" => Some(TrustLevel::Trusted),
            _ => None,
        }
    }
}

/// A user's moderation history snapshot.
///
/// Invariant: `approved_count <= comment_count`. A violation is a
/// data-integrity bug and gets logged, never clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTrustRecord {
    pub user_id: String,
    /// Incremented on every submission, regardless of outcome.
    pub comment_count: u64,
    /// Incremented only when a comment reaches Approved.
    pub approved_count: u64,
    pub last_comment_at: Option<DateTime<Utc>>,
    pub trust_level: TrustLevel,
}

impl UserTrustRecord {
    /// A fresh record for a user with no history.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            comment_count: 0,
            approved_count: 0,
            last_comment_at: None,
            trust_level: TrustLevel::New,
        }
    }

    /// Historical approval ratio. Safe on empty history (0 comments => 0.0).
    pub fn approval_ratio(&self) -> f64 {
        self.approved_count as f64 / self.comment_count.max(1) as f64
    }
}

/// Thresholds for tier derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    pub trusted_min_comments: u64,
    pub trusted_min_ratio: f64,
    pub regular_min_comments: u64,
    pub regular_min_ratio: f64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            trusted_min_comments: 20,  // 20 comments...
            trusted_min_ratio: 0.95,   // ...at >95% approval => Trusted
            regular_min_comments: 5,   // 5 comments...
            regular_min_ratio: 0.8,    // ...at >80% approval => Regular
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum TrustError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("No trust record for user {0}")]
    NotFound(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for reading trust records and persisting derived tiers.
///
/// The counters themselves are written by the comment store, in the same
/// atomic unit as the comment row they belong to - this port only reads
/// them back and stores the tier the ledger derives.
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Fetch a user's record. None if the user has never commented.
    async fn get_record(&self, user_id: &str) -> Result<Option<UserTrustRecord>, TrustError>;

    /// Persist a newly derived trust level.
    async fn set_trust_level(&self, user_id: &str, level: TrustLevel) -> Result<(), TrustError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Tracks submission/approval history and derives trust tiers.
pub struct TrustLedger<S: TrustStore> {
    store: S,
    config: TrustConfig,
}

impl<S: TrustStore> TrustLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: TrustConfig::default(),
        }
    }

    pub fn with_config(store: S, config: TrustConfig) -> Self {
        Self { store, config }
    }

    /// Derive the tier for a (comment_count, approved_count) pair.
    ///
    /// Pure math - the monotonic "never downgrade" rule is applied by the
    /// caller via `recompute`, which maxes against the stored tier.
    pub fn derive_level(&self, comment_count: u64, approved_count: u64) -> TrustLevel {
        let ratio = approved_count as f64 / comment_count.max(1) as f64;

        if comment_count >= self.config.trusted_min_comments
            && ratio > self.config.trusted_min_ratio
        {
            TrustLevel::Trusted
        } else if comment_count >= self.config.regular_min_comments
            && ratio > self.config.regular_min_ratio
        {
            TrustLevel::Regular
        } else {
            TrustLevel::New
        }
    }

    /// Current snapshot for a user. Users with no history get an empty
    /// record rather than an error - every reader treats "never commented"
    /// as zero counts at tier New.
    pub async fn snapshot(&self, user_id: &str) -> Result<UserTrustRecord, TrustError> {
        let record = self
            .store
            .get_record(user_id)
            .await?
            .unwrap_or_else(|| UserTrustRecord::empty(user_id));

        if record.approved_count > record.comment_count {
            tracing::error!(
                user_id = %record.user_id,
                comment_count = record.comment_count,
                approved_count = record.approved_count,
                "Trust ledger integrity violation: approved_count exceeds comment_count"
            );
        }

        Ok(record)
    }

    /// Recompute and persist the trust tier from the stored counters.
    /// Called after any approval lands, whether at submission time, via the
    /// sweep, or by a human moderator.
    ///
    /// No-op for unknown users. Persists only when the tier changed, and
    /// only ever upwards.
    pub async fn recompute(&self, user_id: &str) -> Result<TrustLevel, TrustError> {
        let record = match self.store.get_record(user_id).await? {
            Some(record) => record,
            None => return Ok(TrustLevel::New),
        };

        let derived = self.derive_level(record.comment_count, record.approved_count);
        let next = derived.max(record.trust_level);

        if next != record.trust_level {
            self.store.set_trust_level(user_id, next).await?;
            tracing::info!(
                user_id = %user_id,
                old_level = %record.trust_level,
                new_level = %next,
                comment_count = record.comment_count,
                approved_count = record.approved_count,
                "User trust level upgraded"
            );
        }

        Ok(next)
    }
}

// ============================================================================
// TESTS
// ============================================================================
