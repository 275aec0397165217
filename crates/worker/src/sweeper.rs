//! Retention sweeper loop

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ctfnotify_storage::{EventStore, StoreError};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::config::SweeperConfig;

/// Periodic deletion of events that ended more than a grace period ago
pub struct RetentionSweeper {
    store: Arc<dyn EventStore>,
    config: SweeperConfig,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn EventStore>, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    /// Delete every record with `end_time < now - grace_period`
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let cutoff = now - self.config.grace_period;
        let deleted = self.store.delete_events_ended_before(cutoff).await?;

        if deleted > 0 {
            info!(deleted, %cutoff, "removed finished events");
        } else {
            debug!(%cutoff, "no finished events to remove");
        }
        Ok(deleted)
    }

    /// Sweep until shutdown is signaled, starting immediately
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            grace_secs = self.config.grace_period.num_seconds(),
            "retention sweeper started"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if let Err(e) = self.sweep(Utc::now()).await {
                error!(error = %e, "retention sweep failed, retrying next tick");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown_rx.changed() => {
                    debug!("shutdown signal received during wait");
                    break;
                }
            }
        }

        info!("retention sweeper stopped");
    }
}
