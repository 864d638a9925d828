// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "classifier/mod.rs"]
pub mod classifier;

#[path = "trust/trust_ledger.rs"]
pub mod trust;

#[path = "moderation/mod.rs"]
pub mod moderation;
