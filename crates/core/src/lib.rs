// CTF event notification core
//
// This crate provides the DB-agnostic pieces of the notifier:
// - Event records and the notification flag model
// - A pure evaluator deciding which notification kinds are due at a given instant
// - Message rendering for each notification kind
// - Validation of user-supplied input (catalog URLs, dates, event payloads)
// - Collaborator traits (Delivery, TargetResolver, EventCatalog) implemented by adapter crates
//
// Key design decisions:
// - The evaluator never touches I/O; the worker persists flag changes after delivery
// - Intervals, windows and grace periods are injected through config structs, never globals

pub mod error;
pub mod evaluator;
pub mod event;
pub mod message;
pub mod telemetry;
pub mod traits;
pub mod validation;

// Re-exports for convenience
pub use error::{CatalogError, DeliveryError, ResolveError};
pub use evaluator::{due_notifications, NotificationWindows};
pub use event::{EventRecord, NewEvent, NotificationFlags, NotificationKind, OwnerId};
pub use message::{notification_message, Message, MessageField};
pub use traits::{Delivery, DeliveryTarget, EventCatalog, TargetResolver};
pub use validation::ValidationError;
