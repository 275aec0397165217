//! Notification scheduler loop
//!
//! Each cycle scans every stored event, asks the evaluator which kinds are
//! due, delivers them and persists a flag per successful delivery. Failures
//! are isolated per record; only a failed scan aborts a cycle.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ctfnotify_core::{
    due_notifications, notification_message, Delivery, DeliveryError, DeliveryTarget,
    EventRecord, NotificationKind, OwnerId, ResolveError, TargetResolver,
};
use ctfnotify_storage::{EventStore, StoreError};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SchedulerConfig;

/// Outcome counters of one scheduler cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records inspected
    pub scanned: usize,
    /// Records with due notifications whose owner could not be resolved
    pub unresolved: usize,
    /// Notifications delivered and flagged
    pub delivered: usize,
    /// Notifications the delivery layer rejected
    pub delivery_failures: usize,
    /// Notifications delivered whose flag could not be stored
    pub persist_failures: usize,
}

impl CycleReport {
    fn has_activity(&self) -> bool {
        self.unresolved + self.delivered + self.delivery_failures + self.persist_failures > 0
    }
}

/// Periodic notification delivery
pub struct NotificationScheduler {
    store: Arc<dyn EventStore>,
    delivery: Arc<dyn Delivery>,
    resolver: Arc<dyn TargetResolver>,
    config: SchedulerConfig,
}

impl NotificationScheduler {
    pub fn new(
        store: Arc<dyn EventStore>,
        delivery: Arc<dyn Delivery>,
        resolver: Arc<dyn TargetResolver>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            delivery,
            resolver,
            config,
        }
    }

    /// Run one cycle at `now`
    ///
    /// Only a failure to list the events is returned; everything that goes
    /// wrong for a single record is logged and counted in the report.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport, StoreError> {
        let records = self.store.list_all_events().await?;

        let mut report = CycleReport::default();
        // One resolution per owner per cycle
        let mut targets: HashMap<OwnerId, Result<DeliveryTarget, ResolveError>> = HashMap::new();

        for record in &records {
            report.scanned += 1;

            let due = due_notifications(record, now, &self.config.windows);
            if due.is_empty() {
                continue;
            }

            let target = match targets.get(&record.owner_id) {
                Some(result) => result.clone(),
                None => {
                    let result = self.resolver.resolve(record.owner_id).await;
                    targets.insert(record.owner_id, result.clone());
                    result
                }
            };

            let target = match target {
                Ok(target) => target,
                Err(e) => {
                    warn!(
                        owner_id = record.owner_id,
                        event = %record.name,
                        error = %e,
                        "could not resolve delivery target, skipping this cycle"
                    );
                    report.unresolved += 1;
                    continue;
                }
            };

            for kind in due {
                self.notify(record, kind, &target, &mut report).await;
            }
        }

        Ok(report)
    }

    async fn notify(
        &self,
        record: &EventRecord,
        kind: NotificationKind,
        target: &DeliveryTarget,
        report: &mut CycleReport,
    ) {
        let message = notification_message(kind, record);

        match self.delivery.deliver(target, &message).await {
            Ok(()) => {}
            Err(e) => {
                let retry = match e {
                    DeliveryError::Transient(_) => "retrying next cycle",
                    DeliveryError::Forbidden | DeliveryError::NotFound => "dropped for this cycle",
                };
                warn!(
                    owner_id = record.owner_id,
                    event = %record.name,
                    %kind,
                    error = %e,
                    "notification delivery failed, {}",
                    retry
                );
                report.delivery_failures += 1;
                return;
            }
        }

        match self
            .store
            .set_flag(record.owner_id, &record.name, kind, true)
            .await
        {
            Ok(found) => {
                if !found {
                    debug!(event = %record.name, "event removed while notifying");
                }
                info!(owner_id = record.owner_id, event = %record.name, %kind, "notification sent");
                report.delivered += 1;
            }
            Err(e) => {
                error!(
                    owner_id = record.owner_id,
                    event = %record.name,
                    %kind,
                    error = %e,
                    "notification sent but flag not stored"
                );
                report.persist_failures += 1;
            }
        }
    }

    /// Run cycles until shutdown is signaled
    ///
    /// The first cycle starts immediately. A cycle in progress is finished
    /// before the shutdown is honoured.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "notification scheduler started"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let delay = match self.run_cycle(Utc::now()).await {
                Ok(report) => {
                    if report.has_activity() {
                        info!(?report, "notification cycle complete");
                    } else {
                        debug!(scanned = report.scanned, "notification cycle complete");
                    }
                    self.config.interval
                }
                Err(e) => {
                    let backoff = self.config.error_backoff();
                    error!(error = %e, ?backoff, "notification cycle failed, backing off");
                    backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => {
                    debug!("shutdown signal received during wait");
                    break;
                }
            }
        }

        info!("notification scheduler stopped");
    }
}
