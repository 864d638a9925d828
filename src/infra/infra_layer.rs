// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "moderation/comment_store.rs"]
pub mod moderation;

#[path = "trust/trust_store.rs"]
pub mod trust;
