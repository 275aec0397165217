//! EventStore trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctfnotify_core::{EventRecord, NewEvent, NotificationKind, OwnerId, ValidationError};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An event with the same (owner, name) key already exists
    #[error("event '{name}' already exists for owner {owner_id}")]
    DuplicateKey { owner_id: OwnerId, name: String },

    /// The backing database could not be reached or failed
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The payload breaks a record invariant (empty name, start not before end)
    #[error("invalid event: {0}")]
    Invalid(#[from] ValidationError),

    /// A stored row could not be converted into an event record
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Durable storage of agenda events
///
/// Records are keyed by (owner_id, event_name). Every method is atomic for a
/// single record; no multi-record transactions are offered. "Not found"
/// outcomes are reported through `Option`/`bool`/counts, never as errors.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert an event with all notification flags cleared
    ///
    /// Fails with [`StoreError::DuplicateKey`] and leaves the existing record
    /// untouched if the key is taken, and with [`StoreError::Invalid`] if the
    /// payload does not validate.
    async fn insert_event(&self, owner_id: OwnerId, event: NewEvent)
        -> Result<EventRecord, StoreError>;

    /// Fetch one event
    async fn get_event(&self, owner_id: OwnerId, name: &str)
        -> Result<Option<EventRecord>, StoreError>;

    /// All events of one owner, ordered by start time
    async fn list_events_for_owner(&self, owner_id: OwnerId) -> Result<Vec<EventRecord>, StoreError>;

    /// All events, ordered by owner then start time
    async fn list_all_events(&self) -> Result<Vec<EventRecord>, StoreError>;

    /// Delete one event; returns whether it existed
    async fn delete_event(&self, owner_id: OwnerId, name: &str) -> Result<bool, StoreError>;

    /// Delete every event of one owner; returns the number deleted
    async fn delete_events_for_owner(&self, owner_id: OwnerId) -> Result<u64, StoreError>;

    /// Delete every event whose end time is strictly before `cutoff`
    async fn delete_events_ended_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Set one notification flag; returns whether the event existed
    async fn set_flag(
        &self,
        owner_id: OwnerId,
        name: &str,
        kind: NotificationKind,
        value: bool,
    ) -> Result<bool, StoreError>;
}
