// Core traits for pluggable collaborators
//
// These traits let the notifier run against different backends:
// - Discord REST adapters in production
// - Recording/failing fakes in tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, DeliveryError, ResolveError};
use crate::event::{NewEvent, OwnerId};
use crate::message::Message;

/// Where a message for an owner is sent (e.g. a DM channel)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub owner_id: OwnerId,
    pub channel_id: String,
}

// ============================================================================
// Delivery - sends rendered messages to chat
// ============================================================================

#[async_trait]
pub trait Delivery: Send + Sync {
    /// Resolve once the chat connection can deliver messages
    ///
    /// Implementations without a connection phase are ready immediately.
    async fn wait_until_ready(&self) -> Result<(), DeliveryError> {
        Ok(())
    }

    /// Send one message to a target
    async fn deliver(&self, target: &DeliveryTarget, message: &Message) -> Result<(), DeliveryError>;
}

// ============================================================================
// TargetResolver - maps owners to delivery targets
// ============================================================================

#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn resolve(&self, owner_id: OwnerId) -> Result<DeliveryTarget, ResolveError>;
}

// ============================================================================
// EventCatalog - remote lookup of events by numeric id
// ============================================================================

#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Fetch an event and convert it to an insert payload
    async fn fetch(&self, id: u64) -> Result<NewEvent, CatalogError>;
}
