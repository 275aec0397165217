//! Background loops of the notifier
//!
//! - [`NotificationScheduler`]: periodically evaluates every stored event and
//!   delivers due notifications, persisting a flag per delivered kind
//! - [`RetentionSweeper`]: periodically deletes events that ended long ago
//! - [`NotificationService`]: waits for delivery readiness, then runs both

pub mod config;
pub mod scheduler;
pub mod service;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, SchedulerConfig, SweeperConfig};
pub use scheduler::{CycleReport, NotificationScheduler};
pub use service::{NotificationService, ServiceError};
pub use sweeper::RetentionSweeper;
