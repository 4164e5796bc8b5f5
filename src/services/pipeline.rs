use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::services::digest;
use crate::services::normalizer::{self, NormalizeReport};
use crate::services::notifier::{CHANGE_NOTICE, Messenger, Notifier};
use crate::services::sync_service::{SyncService, SyncSummary};
use crate::source::ScheduleSource;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle was already running.
    Skipped,
    Unchanged {
        digest: String,
    },
    Updated {
        digest: String,
        summary: SyncSummary,
        skipped: NormalizeReport,
        notified: usize,
    },
}

/// fetch -> change detection -> normalize -> synchronize -> notify.
///
/// At most one cycle runs at a time per pipeline; a trigger that arrives
/// while a cycle is in flight is skipped rather than queued.
pub struct Pipeline {
    db: SqlitePool,
    source: Arc<dyn ScheduleSource>,
    sync: SyncService,
    notifier: Notifier,
    in_flight: Mutex<()>,
}

impl Pipeline {
    pub fn new(db: SqlitePool, source: Arc<dyn ScheduleSource>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            sync: SyncService::new(db.clone()),
            notifier: Notifier::new(db.clone(), messenger),
            db,
            source,
            in_flight: Mutex::new(()),
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleOutcome, AppError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            info!("Update cycle already in progress, skipping");
            return Ok(CycleOutcome::Skipped);
        };

        info!("Starting update cycle...");
        let raw = self.source.fetch().await?;
        info!("Fetched data. Sections: {:?}", raw.keys().collect::<Vec<_>>());

        let new_digest = digest::digest(&raw);
        let stored = repository::get_digest(&self.db).await?;
        let stored = stored.as_ref().map(|d| d.value.as_str());

        if !digest::has_changed(&new_digest, stored) {
            info!("Digest matches. No changes.");
            return Ok(CycleOutcome::Unchanged { digest: new_digest });
        }
        info!(
            "Digest mismatch ({} -> {}). Updating database...",
            stored.unwrap_or("none"),
            new_digest
        );

        let (snapshot, skipped) = normalizer::normalize(&raw);
        let summary = self.sync.apply(&snapshot, &new_digest).await?;

        let notified = match self.notifier.broadcast(CHANGE_NOTICE).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Could not load subscribers: {}", e);
                0
            }
        };

        Ok(CycleOutcome::Updated {
            digest: new_digest,
            summary,
            skipped,
            notified,
        })
    }
}
