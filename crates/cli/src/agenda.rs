// Agenda operations
//
// Typed command surface for managing an owner's events. Input is validated
// here before anything reaches the store; store "not found" outcomes are
// returned as values rather than errors.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ctfnotify_core::message::shared_event_message;
use ctfnotify_core::validation::{parse_ctftime_event_url, parse_utc_datetime};
use ctfnotify_core::{
    CatalogError, Delivery, EventCatalog, EventRecord, NewEvent, OwnerId, TargetResolver,
    ValidationError,
};
use ctfnotify_storage::{EventStore, StoreError};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum AgendaError {
    #[error(transparent)]
    Malformed(#[from] ValidationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("event '{0}' has already finished and cannot be added")]
    AlreadyFinished(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of adding an event
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Added(EventRecord),
    AlreadyExists(String),
}

/// Result of sharing an event with another owner
#[derive(Debug, Clone, PartialEq)]
pub enum ShareOutcome {
    Shared(EventRecord),
    RecipientAlreadyHas,
    NotFound,
}

/// User-typed event without a catalog entry
#[derive(Debug, Clone, Default)]
pub struct CustomEvent {
    pub name: String,
    /// `YYYY-MM-DD HH:MM` (UTC) or RFC 3339
    pub start: String,
    pub end: String,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// Agenda management on top of the event store
pub struct AgendaService {
    store: Arc<dyn EventStore>,
    catalog: Arc<dyn EventCatalog>,
    delivery: Option<Arc<dyn Delivery>>,
    resolver: Option<Arc<dyn TargetResolver>>,
}

impl AgendaService {
    pub fn new(store: Arc<dyn EventStore>, catalog: Arc<dyn EventCatalog>) -> Self {
        Self {
            store,
            catalog,
            delivery: None,
            resolver: None,
        }
    }

    /// Enable direct messages for shared events
    pub fn with_notifier(
        mut self,
        delivery: Arc<dyn Delivery>,
        resolver: Arc<dyn TargetResolver>,
    ) -> Self {
        self.delivery = Some(delivery);
        self.resolver = Some(resolver);
        self
    }

    async fn insert(&self, owner_id: OwnerId, event: NewEvent) -> Result<AddOutcome, AgendaError> {
        match self.store.insert_event(owner_id, event).await {
            Ok(record) => {
                info!(owner_id, event = %record.name, "event added");
                Ok(AddOutcome::Added(record))
            }
            Err(StoreError::DuplicateKey { name, .. }) => {
                debug!(owner_id, event = %name, "event already in agenda");
                Ok(AddOutcome::AlreadyExists(name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Add an event by its CTFtime URL
    pub async fn add_from_url(
        &self,
        owner_id: OwnerId,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<AddOutcome, AgendaError> {
        let event_id = parse_ctftime_event_url(url)?;
        let event = self.catalog.fetch(event_id).await?;

        if event.end_time < now {
            return Err(AgendaError::AlreadyFinished(event.name));
        }

        self.insert(owner_id, event.validate()?).await
    }

    /// Add an event typed in by the user
    pub async fn add_custom(
        &self,
        owner_id: OwnerId,
        custom: CustomEvent,
    ) -> Result<AddOutcome, AgendaError> {
        let start = parse_utc_datetime(&custom.start)?;
        let end = parse_utc_datetime(&custom.end)?;

        let mut event = NewEvent::new(custom.name.trim(), start, end);
        event.description = custom.description.filter(|d| !d.trim().is_empty());
        event.site_url = custom.url.filter(|u| !u.trim().is_empty());

        self.insert(owner_id, event.validate()?).await
    }

    /// The owner's events, ordered by start time
    pub async fn list(&self, owner_id: OwnerId) -> Result<Vec<EventRecord>, AgendaError> {
        Ok(self.store.list_events_for_owner(owner_id).await?)
    }

    pub async fn details(
        &self,
        owner_id: OwnerId,
        name: &str,
    ) -> Result<Option<EventRecord>, AgendaError> {
        Ok(self.store.get_event(owner_id, name).await?)
    }

    /// Remove one event; `false` if it was not in the agenda
    pub async fn remove(&self, owner_id: OwnerId, name: &str) -> Result<bool, AgendaError> {
        let removed = self.store.delete_event(owner_id, name).await?;
        if removed {
            info!(owner_id, event = %name, "event removed");
        }
        Ok(removed)
    }

    /// Remove every event of the owner; returns how many were removed
    pub async fn clear(&self, owner_id: OwnerId) -> Result<u64, AgendaError> {
        let removed = self.store.delete_events_for_owner(owner_id).await?;
        info!(owner_id, removed, "agenda cleared");
        Ok(removed)
    }

    /// Copy an event into another owner's agenda with fresh notification flags
    pub async fn share(
        &self,
        owner_id: OwnerId,
        name: &str,
        recipient_id: OwnerId,
    ) -> Result<ShareOutcome, AgendaError> {
        let Some(record) = self.store.get_event(owner_id, name).await? else {
            return Ok(ShareOutcome::NotFound);
        };

        let shared = match self.insert(recipient_id, record.to_new_event()).await? {
            AddOutcome::Added(shared) => shared,
            AddOutcome::AlreadyExists(_) => return Ok(ShareOutcome::RecipientAlreadyHas),
        };

        self.notify_recipient(owner_id, &shared).await;
        Ok(ShareOutcome::Shared(shared))
    }

    /// Best-effort direct message to the recipient of a shared event
    async fn notify_recipient(&self, sharer_id: OwnerId, shared: &EventRecord) {
        let (Some(delivery), Some(resolver)) = (&self.delivery, &self.resolver) else {
            return;
        };

        let target = match resolver.resolve(shared.owner_id).await {
            Ok(target) => target,
            Err(e) => {
                warn!(recipient = shared.owner_id, error = %e, "could not reach share recipient");
                return;
            }
        };

        let message = shared_event_message(&format!("<@{}>", sharer_id), &shared.name);
        if let Err(e) = delivery.deliver(&target, &message).await {
            warn!(recipient = shared.owner_id, error = %e, "share notification not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use ctfnotify_core::{DeliveryError, DeliveryTarget, Message, NotificationKind, ResolveError};
    use ctfnotify_ctftime::CtftimeClient;
    use ctfnotify_storage::InMemoryEventStore;
    use parking_lot::Mutex;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
    }

    /// Catalog serving fixed events by id
    struct FixedCatalog(Vec<(u64, NewEvent)>);

    #[async_trait]
    impl EventCatalog for FixedCatalog {
        async fn fetch(&self, id: u64) -> Result<NewEvent, CatalogError> {
            self.0
                .iter()
                .find(|(event_id, _)| *event_id == id)
                .map(|(_, event)| event.clone())
                .ok_or(CatalogError::NotFound(id))
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(DeliveryTarget, Message)>>,
        fail: bool,
    }

    #[async_trait]
    impl Delivery for Outbox {
        async fn deliver(&self, target: &DeliveryTarget, message: &Message) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Forbidden);
            }
            self.sent.lock().push((target.clone(), message.clone()));
            Ok(())
        }
    }

    struct Dm;

    #[async_trait]
    impl TargetResolver for Dm {
        async fn resolve(&self, owner_id: OwnerId) -> Result<DeliveryTarget, ResolveError> {
            Ok(DeliveryTarget {
                owner_id,
                channel_id: format!("dm-{owner_id}"),
            })
        }
    }

    fn upcoming() -> NewEvent {
        NewEvent::new(
            "ImaginaryCTF-2025",
            now() + Duration::days(2),
            now() + Duration::days(3),
        )
    }

    fn service() -> (Arc<InMemoryEventStore>, AgendaService) {
        let store = Arc::new(InMemoryEventStore::new());
        let finished = NewEvent::new(
            "Old-CTF",
            now() - Duration::days(3),
            now() - Duration::days(2),
        );
        let catalog = FixedCatalog(vec![(2500, upcoming()), (1000, finished)]);
        let service = AgendaService::new(store.clone(), Arc::new(catalog));
        (store, service)
    }

    fn custom(name: &str, start: &str, end: &str) -> CustomEvent {
        CustomEvent {
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_from_url() {
        let (store, service) = service();

        let outcome = service
            .add_from_url(1, "https://ctftime.org/event/2500", now())
            .await
            .unwrap();

        match outcome {
            AddOutcome::Added(record) => assert_eq!(record.name, "ImaginaryCTF-2025"),
            other => panic!("expected Added, got {other:?}"),
        }
        assert_eq!(store.event_count(), 1);

        let again = service
            .add_from_url(1, "https://ctftime.org/event/2500/", now())
            .await
            .unwrap();
        assert_eq!(
            again,
            AddOutcome::AlreadyExists("ImaginaryCTF-2025".to_string())
        );
    }

    #[tokio::test]
    async fn test_add_from_url_rejects_bad_input() {
        let (store, service) = service();

        let err = service
            .add_from_url(1, "https://example.com/event/2500", now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgendaError::Malformed(ValidationError::InvalidEventUrl(_))
        ));

        let err = service
            .add_from_url(1, "https://ctftime.org/event/404", now())
            .await
            .unwrap_err();
        assert!(matches!(err, AgendaError::Catalog(CatalogError::NotFound(404))));

        let err = service
            .add_from_url(1, "http://ctftime.org/event/1000", now())
            .await
            .unwrap_err();
        assert!(matches!(err, AgendaError::AlreadyFinished(ref name) if name == "Old-CTF"));

        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn test_add_from_url_with_ctftime_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events/2500/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "ImaginaryCTF 2025",
                "start": "2025-07-03T09:00:00+00:00",
                "finish": "2025-07-04T09:00:00+00:00",
                "ctftime_url": "https://ctftime.org/event/2500/",
                "organizers": [{"id": 1, "name": "ImaginaryCTF"}]
            })))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryEventStore::new());
        let catalog = CtftimeClient::with_base_url(server.uri()).unwrap();
        let service = AgendaService::new(store.clone(), Arc::new(catalog));

        service
            .add_from_url(8, "https://ctftime.org/event/2500", now())
            .await
            .unwrap();

        let record = store.get_event(8, "ImaginaryCTF-2025").await.unwrap().unwrap();
        assert_eq!(record.organizers.as_deref(), Some("ImaginaryCTF"));
    }

    #[tokio::test]
    async fn test_add_custom() {
        let (_, service) = service();

        let mut event = custom("Team Training", "2025-07-10 18:00", "2025-07-10T22:30");
        event.description = Some("Internal practice".to_string());
        event.url = Some(String::new());

        let outcome = service.add_custom(2, event).await.unwrap();
        let AddOutcome::Added(record) = outcome else {
            panic!("expected Added");
        };

        assert_eq!(record.name, "Team Training");
        assert_eq!(
            record.start_time,
            Utc.with_ymd_and_hms(2025, 7, 10, 18, 0, 0).unwrap()
        );
        assert_eq!(record.description.as_deref(), Some("Internal practice"));
        assert_eq!(record.site_url, None);
        assert!(record.source_url.is_none());
    }

    #[tokio::test]
    async fn test_add_custom_rejects_malformed_input() {
        let (store, service) = service();

        let err = service
            .add_custom(2, custom("Backwards", "2025-07-10 18:00", "2025-07-10 17:00"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgendaError::Malformed(ValidationError::StartNotBeforeEnd { .. })
        ));

        let err = service
            .add_custom(2, custom("Bad date", "10/07/2025", "2025-07-10 17:00"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgendaError::Malformed(ValidationError::InvalidDate(_))
        ));

        let err = service
            .add_custom(2, custom("   ", "2025-07-10 18:00", "2025-07-10 19:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgendaError::Malformed(ValidationError::EmptyName)));

        assert_eq!(store.event_count(), 0);
    }

    #[tokio::test]
    async fn test_list_details_remove_clear() {
        let (_, service) = service();
        service
            .add_custom(3, custom("later", "2025-08-01 10:00", "2025-08-01 12:00"))
            .await
            .unwrap();
        service
            .add_custom(3, custom("sooner", "2025-07-15 10:00", "2025-07-15 12:00"))
            .await
            .unwrap();
        service
            .add_custom(4, custom("other", "2025-07-15 10:00", "2025-07-15 12:00"))
            .await
            .unwrap();

        let names: Vec<_> = service
            .list(3)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["sooner", "later"]);

        assert!(service.details(3, "later").await.unwrap().is_some());
        assert!(service.details(3, "Later").await.unwrap().is_none());

        assert!(service.remove(3, "later").await.unwrap());
        assert!(!service.remove(3, "later").await.unwrap());

        assert_eq!(service.clear(3).await.unwrap(), 1);
        assert!(service.list(3).await.unwrap().is_empty());
        assert_eq!(service.list(4).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_share_copies_with_fresh_flags() {
        let (store, service) = service();
        let outbox = Arc::new(Outbox::default());
        let service = service.with_notifier(outbox.clone(), Arc::new(Dm));

        service
            .add_from_url(1, "https://ctftime.org/event/2500", now())
            .await
            .unwrap();
        store
            .set_flag(1, "ImaginaryCTF-2025", NotificationKind::Reminder, true)
            .await
            .unwrap();

        let outcome = service.share(1, "ImaginaryCTF-2025", 2).await.unwrap();
        let ShareOutcome::Shared(copy) = outcome else {
            panic!("expected Shared");
        };
        assert_eq!(copy.owner_id, 2);
        assert!(!copy.flags.reminder);

        let sent = outbox.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.channel_id, "dm-2");
        assert_eq!(sent[0].1.title, "📅 Event Shared");
        assert_eq!(
            sent[0].1.description,
            "<@1> shared **ImaginaryCTF-2025** with you."
        );
    }

    #[tokio::test]
    async fn test_share_outcomes() {
        let (_, service) = service();
        service
            .add_from_url(1, "https://ctftime.org/event/2500", now())
            .await
            .unwrap();

        assert_eq!(
            service.share(1, "missing", 2).await.unwrap(),
            ShareOutcome::NotFound
        );
        assert!(matches!(
            service.share(1, "ImaginaryCTF-2025", 2).await.unwrap(),
            ShareOutcome::Shared(_)
        ));
        assert_eq!(
            service.share(1, "ImaginaryCTF-2025", 2).await.unwrap(),
            ShareOutcome::RecipientAlreadyHas
        );
    }

    #[tokio::test]
    async fn test_share_succeeds_when_dm_fails() {
        let (store, service) = service();
        let outbox = Arc::new(Outbox {
            fail: true,
            ..Default::default()
        });
        let service = service.with_notifier(outbox, Arc::new(Dm));
        service
            .add_from_url(1, "https://ctftime.org/event/2500", now())
            .await
            .unwrap();

        assert!(matches!(
            service.share(1, "ImaginaryCTF-2025", 5).await.unwrap(),
            ShareOutcome::Shared(_)
        ));
        assert!(store.get_event(5, "ImaginaryCTF-2025").await.unwrap().is_some());
    }
}
