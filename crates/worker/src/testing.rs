// In-crate fakes for the scheduler, sweeper and service tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctfnotify_core::{
    Delivery, DeliveryError, DeliveryTarget, EventRecord, Message, NewEvent, NotificationKind,
    OwnerId, ResolveError, TargetResolver,
};
use ctfnotify_storage::{EventStore, InMemoryEventStore, StoreError};
use parking_lot::Mutex;

/// Delivery that records every message and can be told to fail
#[derive(Default)]
pub struct RecordingDelivery {
    pub sent: Mutex<Vec<(DeliveryTarget, Message)>>,
    /// Outcomes consumed in order before falling back to success
    pub failures: Mutex<VecDeque<DeliveryError>>,
    pub ready_error: Mutex<Option<DeliveryError>>,
    pub ready_calls: AtomicUsize,
}

impl RecordingDelivery {
    pub fn fail_next(&self, error: DeliveryError) {
        self.failures.lock().push_back(error);
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, m)| m.title.clone()).collect()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn wait_until_ready(&self) -> Result<(), DeliveryError> {
        self.ready_calls.fetch_add(1, Ordering::SeqCst);
        match self.ready_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn deliver(&self, target: &DeliveryTarget, message: &Message) -> Result<(), DeliveryError> {
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        self.sent.lock().push((target.clone(), message.clone()));
        Ok(())
    }
}

/// Delivery whose readiness never resolves
pub struct NeverReady;

#[async_trait]
impl Delivery for NeverReady {
    async fn wait_until_ready(&self) -> Result<(), DeliveryError> {
        std::future::pending().await
    }

    async fn deliver(&self, _: &DeliveryTarget, _: &Message) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Resolver mapping owner `n` to channel `dm-n`, with per-owner failures
#[derive(Default)]
pub struct FakeResolver {
    pub failing: Mutex<HashMap<OwnerId, ResolveError>>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn fail_owner(&self, owner_id: OwnerId, error: ResolveError) {
        self.failing.lock().insert(owner_id, error);
    }
}

#[async_trait]
impl TargetResolver for FakeResolver {
    async fn resolve(&self, owner_id: OwnerId) -> Result<DeliveryTarget, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failing.lock().get(&owner_id) {
            return Err(error.clone());
        }
        Ok(DeliveryTarget {
            owner_id,
            channel_id: format!("dm-{owner_id}"),
        })
    }
}

/// In-memory store with switchable failures and call counters
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryEventStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub list_calls: AtomicUsize,
    pub sweep_calls: AtomicUsize,
}

impl FlakyStore {
    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("database is locked".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn insert_event(&self, owner_id: OwnerId, event: NewEvent) -> Result<EventRecord, StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.insert_event(owner_id, event).await
    }

    async fn get_event(&self, owner_id: OwnerId, name: &str) -> Result<Option<EventRecord>, StoreError> {
        Self::check(&self.fail_reads)?;
        self.inner.get_event(owner_id, name).await
    }

    async fn list_events_for_owner(&self, owner_id: OwnerId) -> Result<Vec<EventRecord>, StoreError> {
        Self::check(&self.fail_reads)?;
        self.inner.list_events_for_owner(owner_id).await
    }

    async fn list_all_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_reads)?;
        self.inner.list_all_events().await
    }

    async fn delete_event(&self, owner_id: OwnerId, name: &str) -> Result<bool, StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.delete_event(owner_id, name).await
    }

    async fn delete_events_for_owner(&self, owner_id: OwnerId) -> Result<u64, StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.delete_events_for_owner(owner_id).await
    }

    async fn delete_events_ended_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        self.sweep_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_writes)?;
        self.inner.delete_events_ended_before(cutoff).await
    }

    async fn set_flag(
        &self,
        owner_id: OwnerId,
        name: &str,
        kind: NotificationKind,
        value: bool,
    ) -> Result<bool, StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.set_flag(owner_id, name, kind, value).await
    }
}
