//! Persistence layer for agenda events
//!
//! This module provides:
//! - [`EventStore`] trait for event persistence, keyed by (owner_id, event_name)
//! - [`InMemoryEventStore`] for testing
//! - [`SqliteEventStore`] for production

mod memory;
mod sqlite;
mod store;

pub use memory::InMemoryEventStore;
pub use sqlite::{SqliteEventStore, DEFAULT_DATABASE_URL};
pub use store::{EventStore, StoreError};
