// Sweep daemon entry point.
//
// The web layer decides comment submissions inline; this process is the
// scheduler side of the pipeline. Its job is to:
// 1. Load configuration
// 2. Initialize stores and the moderation service (dependency injection)
// 3. Run the deferred approval sweep on a fixed interval
//
// Environment:
// - MODERATION_DB                    path to the SQLite file (default data/moderation.db)
// - MODERATION_SWEEP_INTERVAL_SECS   seconds between sweep runs (default 300)
// - MODERATION_KEYWORDS_FILE         optional JSON override for the keyword tables

use anyhow::Context;
use comment_guard::core::classifier::{KeywordTables, SensitivityClassifier};
use comment_guard::core::moderation::ModerationService;
use comment_guard::core::trust::TrustLedger;
use comment_guard::infra::moderation::SqliteCommentStore;
use comment_guard::infra::trust::SqliteTrustStore;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Keep the runtime database in a dedicated folder so the repo root stays tidy.
    let db_path =
        std::env::var("MODERATION_DB").unwrap_or_else(|_| "data/moderation.db".to_string());
    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory for {}", db_path))?;
    }

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await
        .with_context(|| format!("Failed to connect to {}", db_path))?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Wire the stores into the service. This is the composition root.

    // The comment store writes the user_trust counters in the same
    // transaction as each comment row, so both migrations run up front.
    let trust_store = SqliteTrustStore::new(pool.clone());
    trust_store
        .migrate()
        .await
        .context("Failed to migrate user_trust table")?;

    let comment_store = SqliteCommentStore::new(pool);
    comment_store
        .migrate()
        .await
        .context("Failed to migrate comments table")?;

    // Moderators can swap keyword tables without a rebuild.
    let tables = match std::env::var("MODERATION_KEYWORDS_FILE") {
        Ok(path) => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read keyword tables at {}", path))?;
            let tables = KeywordTables::from_json(&data)
                .with_context(|| format!("Failed to parse keyword tables at {}", path))?;
            tracing::info!(path = %path, "Loaded keyword table override");
            tables
        }
        Err(_) => KeywordTables::default(),
    };

    let service = ModerationService::new(comment_store, TrustLedger::new(trust_store))
        .with_classifier(SensitivityClassifier::new(tables));

    let interval_secs = std::env::var("MODERATION_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(300);

    tracing::info!(db = %db_path, interval_secs, "Approval sweep daemon starting");

    // The sweep is idempotent per comment, so an overlapping run elsewhere
    // (another instance, a manual trigger) is tolerated.
    loop {
        match service.run_approval_sweep().await {
            Ok(report) => {
                if report.promoted > 0 || report.failed > 0 {
                    tracing::info!(
                        scanned = report.scanned,
                        promoted = report.promoted,
                        failed = report.failed,
                        "Sweep run complete"
                    );
                } else {
                    tracing::debug!(scanned = report.scanned, "Sweep run complete, nothing to promote");
                }
            }
            Err(err) => tracing::warn!("Sweep run failed: {}", err),
        }

        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}
