use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::services::pipeline::{CycleOutcome, Pipeline};

/// Runs one update cycle immediately, then one per interval.
pub struct SyncScheduler {
    pipeline: Arc<Pipeline>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(pipeline: Arc<Pipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub async fn start(self) {
        info!("Starting schedule updater (interval: {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // The first tick completes immediately.
            ticker.tick().await;

            match self.pipeline.run_cycle().await {
                Ok(CycleOutcome::Updated { summary, notified, .. }) => {
                    info!(
                        "Schedule updated - {} lessons, {} substitutions, {} notified",
                        summary.lessons_inserted, summary.substitutions_inserted, notified
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Update cycle failed: {}", e);
                }
            }
        }
    }
}
