// Comment moderation core for the blog platform.
//
// **Architecture Overview:**
// - `core/` = Business logic (storage-agnostic)
// - `infra/` = Implementations of core traits (SQLite, in-memory)
//
// The web layer that renders pages and authenticates users lives elsewhere;
// it consumes this crate through the `ModerationService` and `TrustLedger`
// entry points and injects whichever store implementation fits.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
pub mod core;
#[path = "infra/infra_layer.rs"]
pub mod infra;
