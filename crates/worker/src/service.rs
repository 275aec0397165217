//! Notification service: readiness gate plus both background loops

use std::sync::Arc;

use ctfnotify_core::{Delivery, DeliveryError, TargetResolver};
use ctfnotify_storage::EventStore;
use tokio::sync::watch;
use tracing::info;

use crate::config::{SchedulerConfig, SweeperConfig};
use crate::scheduler::NotificationScheduler;
use crate::sweeper::RetentionSweeper;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("delivery never became ready: {0}")]
    NotReady(#[from] DeliveryError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Runs the scheduler and the sweeper once delivery is ready
pub struct NotificationService {
    store: Arc<dyn EventStore>,
    delivery: Arc<dyn Delivery>,
    resolver: Arc<dyn TargetResolver>,
    scheduler_config: SchedulerConfig,
    sweeper_config: SweeperConfig,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn EventStore>,
        delivery: Arc<dyn Delivery>,
        resolver: Arc<dyn TargetResolver>,
    ) -> Self {
        Self {
            store,
            delivery,
            resolver,
            scheduler_config: SchedulerConfig::default(),
            sweeper_config: SweeperConfig::default(),
        }
    }

    pub fn with_scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler_config = config;
        self
    }

    pub fn with_sweeper_config(mut self, config: SweeperConfig) -> Self {
        self.sweeper_config = config;
        self
    }

    /// Run until shutdown is signaled
    ///
    /// Returns `Ok(())` without starting the loops if shutdown arrives while
    /// waiting for delivery readiness.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), ServiceError> {
        tokio::select! {
            ready = self.delivery.wait_until_ready() => ready?,
            _ = shutdown_rx.changed() => {
                info!("shutdown before delivery was ready");
                return Ok(());
            }
        }

        let scheduler = NotificationScheduler::new(
            self.store.clone(),
            self.delivery,
            self.resolver,
            self.scheduler_config,
        );
        let sweeper = RetentionSweeper::new(self.store, self.sweeper_config);

        let scheduler_rx = shutdown_rx.clone();
        let scheduler_task = tokio::spawn(async move { scheduler.run(scheduler_rx).await });
        let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

        let (scheduler_result, sweeper_result) = tokio::join!(scheduler_task, sweeper_task);
        scheduler_result?;
        sweeper_result?;

        info!("notification service stopped");
        Ok(())
    }
}
