// In-memory implementation of TrustStore.

use crate::core::trust::{TrustError, TrustLevel, TrustStore, UserTrustRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-memory trust store over the record map owned by the comment store.
///
/// The counters are written by `InMemoryCommentStore` in the same unit as
/// the comment rows they belong to; this view reads them back and persists
/// the tiers the ledger derives. Construct it via
/// `InMemoryCommentStore::trust_view()`.
pub struct InMemoryTrustStore {
    records: Arc<DashMap<String, UserTrustRecord>>,
}

impl InMemoryTrustStore {
    pub(crate) fn sharing(records: Arc<DashMap<String, UserTrustRecord>>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl TrustStore for InMemoryTrustStore {
    async fn get_record(&self, user_id: &str) -> Result<Option<UserTrustRecord>, TrustError> {
        Ok(self.records.get(user_id).map(|r| r.clone()))
    }

    async fn set_trust_level(&self, user_id: &str, level: TrustLevel) -> Result<(), TrustError> {
        match self.records.get_mut(user_id) {
            Some(mut entry) => {
                entry.trust_level = level;
                Ok(())
            }
            None => Err(TrustError::NotFound(user_id.to_string())),
        }
    }
}
