//! In-memory implementation of EventStore for testing

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctfnotify_core::{EventRecord, NewEvent, NotificationKind, OwnerId};
use parking_lot::RwLock;

use crate::store::{EventStore, StoreError};

type EventKey = (OwnerId, String);

/// In-memory implementation of EventStore
///
/// This is primarily for testing. It stores all data in memory and
/// provides the same semantics as the SQLite implementation.
///
/// # Example
///
/// ```
/// use ctfnotify_storage::InMemoryEventStore;
///
/// let store = InMemoryEventStore::new();
/// assert_eq!(store.event_count(), 0);
/// ```
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<BTreeMap<EventKey, EventRecord>>,
}

impl InMemoryEventStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored events
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }
}

fn sort_by_owner_then_start(records: &mut [EventRecord]) {
    records.sort_by(|a, b| {
        a.owner_id
            .cmp(&b.owner_id)
            .then(a.start_time.cmp(&b.start_time))
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_event(
        &self,
        owner_id: OwnerId,
        event: NewEvent,
    ) -> Result<EventRecord, StoreError> {
        let event = event.validate()?;
        let key = (owner_id, event.name.clone());
        let mut events = self.events.write();

        if events.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                owner_id,
                name: event.name,
            });
        }

        let record = event.into_record(owner_id);
        events.insert(key, record.clone());
        Ok(record)
    }

    async fn get_event(
        &self,
        owner_id: OwnerId,
        name: &str,
    ) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.events.read().get(&(owner_id, name.to_string())).cloned())
    }

    async fn list_events_for_owner(&self, owner_id: OwnerId) -> Result<Vec<EventRecord>, StoreError> {
        let mut records: Vec<_> = self
            .events
            .read()
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        sort_by_owner_then_start(&mut records);
        Ok(records)
    }

    async fn list_all_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let mut records: Vec<_> = self.events.read().values().cloned().collect();
        sort_by_owner_then_start(&mut records);
        Ok(records)
    }

    async fn delete_event(&self, owner_id: OwnerId, name: &str) -> Result<bool, StoreError> {
        Ok(self
            .events
            .write()
            .remove(&(owner_id, name.to_string()))
            .is_some())
    }

    async fn delete_events_for_owner(&self, owner_id: OwnerId) -> Result<u64, StoreError> {
        let mut events = self.events.write();
        let before = events.len();
        events.retain(|(owner, _), _| *owner != owner_id);
        Ok((before - events.len()) as u64)
    }

    async fn delete_events_ended_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut events = self.events.write();
        let before = events.len();
        events.retain(|_, record| record.end_time >= cutoff);
        Ok((before - events.len()) as u64)
    }

    async fn set_flag(
        &self,
        owner_id: OwnerId,
        name: &str,
        kind: NotificationKind,
        value: bool,
    ) -> Result<bool, StoreError> {
        match self.events.write().get_mut(&(owner_id, name.to_string())) {
            Some(record) => {
                record.flags.set(kind, value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn event(name: &str, start_hour: u32) -> NewEvent {
        NewEvent::new(name, at(start_hour), at(start_hour) + Duration::hours(2))
    }

    #[tokio::test]
    async fn test_insert_and_get_event() {
        let store = InMemoryEventStore::new();

        let record = store.insert_event(7, event("justCTF", 10)).await.unwrap();
        assert_eq!(record.owner_id, 7);
        assert!(!record.flags.reminder);

        let fetched = store.get_event(7, "justCTF").await.unwrap().unwrap();
        assert_eq!(fetched, record);

        // Names are scoped per owner
        assert!(store.get_event(8, "justCTF").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_keeps_original() {
        let store = InMemoryEventStore::new();
        store.insert_event(7, event("justCTF", 10)).await.unwrap();
        store
            .set_flag(7, "justCTF", NotificationKind::Reminder, true)
            .await
            .unwrap();

        let result = store.insert_event(7, event("justCTF", 14)).await;
        assert!(matches!(
            result,
            Err(StoreError::DuplicateKey { owner_id: 7, ref name }) if name == "justCTF"
        ));

        let kept = store.get_event(7, "justCTF").await.unwrap().unwrap();
        assert_eq!(kept.start_time, at(10));
        assert!(kept.flags.reminder);
    }

    #[tokio::test]
    async fn test_same_name_for_different_owners() {
        let store = InMemoryEventStore::new();
        store.insert_event(1, event("DEF-CON-Quals", 10)).await.unwrap();
        store.insert_event(2, event("DEF-CON-Quals", 10)).await.unwrap();
        assert_eq!(store.event_count(), 2);
    }

    #[tokio::test]
    async fn test_list_ordering() {
        let store = InMemoryEventStore::new();
        store.insert_event(2, event("b-late", 15)).await.unwrap();
        store.insert_event(1, event("a-late", 14)).await.unwrap();
        store.insert_event(1, event("z-early", 9)).await.unwrap();

        let owner_one: Vec<_> = store
            .list_events_for_owner(1)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(owner_one, vec!["z-early", "a-late"]);

        let all: Vec<_> = store
            .list_all_events()
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.owner_id, r.name))
            .collect();
        assert_eq!(
            all,
            vec![
                (1, "z-early".to_string()),
                (1, "a-late".to_string()),
                (2, "b-late".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_operations() {
        let store = InMemoryEventStore::new();
        store.insert_event(1, event("one", 9)).await.unwrap();
        store.insert_event(1, event("two", 10)).await.unwrap();
        store.insert_event(2, event("three", 11)).await.unwrap();

        assert!(store.delete_event(1, "one").await.unwrap());
        assert!(!store.delete_event(1, "one").await.unwrap());

        assert_eq!(store.delete_events_for_owner(1).await.unwrap(), 1);
        assert_eq!(store.delete_events_for_owner(1).await.unwrap(), 0);
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_events_ended_before_is_strict() {
        let store = InMemoryEventStore::new();
        // Ends at 12:00
        store.insert_event(1, event("boundary", 10)).await.unwrap();
        // Ends at 11:00
        store.insert_event(1, event("old", 9)).await.unwrap();

        assert_eq!(store.delete_events_ended_before(at(12)).await.unwrap(), 1);
        assert!(store.get_event(1, "boundary").await.unwrap().is_some());
        assert!(store.get_event(1, "old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_payloads() {
        let store = InMemoryEventStore::new();

        let inverted = NewEvent::new("inverted", at(12), at(11));
        let err = store.insert_event(1, inverted).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        let unnamed = NewEvent::new("  ", at(10), at(11));
        let err = store.insert_event(1, unnamed).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn test_returned_record_matches_stored_precision() {
        let store = InMemoryEventStore::new();
        let start = at(10) + Duration::microseconds(1_500);

        let inserted = store
            .insert_event(1, NewEvent::new("precise", start, at(12)))
            .await
            .unwrap();
        let fetched = store.get_event(1, "precise").await.unwrap().unwrap();

        assert_eq!(inserted, fetched);
        assert_eq!(fetched.start_time, at(10) + Duration::milliseconds(1));
    }

    #[tokio::test]
    async fn test_set_flag() {
        let store = InMemoryEventStore::new();
        store.insert_event(1, event("justCTF", 10)).await.unwrap();

        assert!(store
            .set_flag(1, "justCTF", NotificationKind::EndingSoon, true)
            .await
            .unwrap());
        assert!(!store
            .set_flag(1, "missing", NotificationKind::EndingSoon, true)
            .await
            .unwrap());

        let record = store.get_event(1, "justCTF").await.unwrap().unwrap();
        assert!(record.flags.ending_soon);
        assert!(!record.flags.reminder);
        assert!(!record.flags.good_luck);
        assert!(!record.flags.congratulations);
    }
}
