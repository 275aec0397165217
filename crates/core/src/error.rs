// Error types for collaborator calls

use thiserror::Error;

use crate::event::OwnerId;

/// Why a message could not be delivered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The target refuses messages (e.g. DMs disabled); not retried this cycle
    #[error("delivery forbidden by target")]
    Forbidden,

    /// The target no longer exists; not retried this cycle
    #[error("delivery target not found")]
    NotFound,

    /// Network/rate-limit/server failure; retried on the next cycle
    #[error("transient delivery failure: {0}")]
    Transient(String),
}

impl DeliveryError {
    pub fn transient(msg: impl Into<String>) -> Self {
        DeliveryError::Transient(msg.into())
    }
}

/// Why an owner could not be resolved to a delivery target
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("user {0} not found")]
    NotFound(OwnerId),

    #[error("transient resolution failure: {0}")]
    Transient(String),
}

/// Failures of the remote event catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog event {0} not found")]
    NotFound(u64),

    #[error("catalog request failed: {0}")]
    Http(String),

    #[error("catalog returned invalid data: {0}")]
    InvalidData(String),
}
