//! Scheduler and sweeper configuration

use std::time::Duration;

use ctfnotify_core::NotificationWindows;

const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(20);
const DEFAULT_ERROR_BACKOFF_MULTIPLIER: u32 = 5;
const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_RETENTION_GRACE_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("check interval {interval:?} is wider than the narrowest notification window {window:?}")]
    IntervalExceedsWindow { interval: Duration, window: Duration },

    #[error("retention grace period {grace:?} is shorter than the scheduler error backoff {backoff:?}")]
    GraceShorterThanBackoff { grace: Duration, backoff: Duration },
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

// =============================================================================
// SchedulerConfig
// =============================================================================

/// Notification scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between cycles
    pub interval: Duration,
    /// After a failed cycle the loop waits `interval * error_backoff_multiplier`
    pub error_backoff_multiplier: u32,
    /// Trigger windows handed to the evaluator
    pub windows: NotificationWindows,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CHECK_INTERVAL,
            error_backoff_multiplier: DEFAULT_ERROR_BACKOFF_MULTIPLIER,
            windows: NotificationWindows::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `NOTIFICATION_CHECK_INTERVAL_SECS`: Time between cycles (default: 20)
    /// - `NOTIFICATION_ERROR_BACKOFF_MULTIPLIER`: Interval multiplier after a failed cycle (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = env_u64("NOTIFICATION_CHECK_INTERVAL_SECS")? {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(multiplier) = env_u64("NOTIFICATION_ERROR_BACKOFF_MULTIPLIER")? {
            config.error_backoff_multiplier =
                u32::try_from(multiplier).map_err(|_| ConfigError::InvalidValue {
                    name: "NOTIFICATION_ERROR_BACKOFF_MULTIPLIER",
                    value: multiplier.to_string(),
                })?;
        }
        Ok(config)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_error_backoff_multiplier(mut self, multiplier: u32) -> Self {
        self.error_backoff_multiplier = multiplier;
        self
    }

    pub fn with_windows(mut self, windows: NotificationWindows) -> Self {
        self.windows = windows;
        self
    }

    /// Delay after a failed cycle
    pub fn error_backoff(&self) -> Duration {
        self.interval.saturating_mul(self.error_backoff_multiplier)
    }

    /// Reject settings that would let a notification window pass between two cycles
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Zero("notification check interval"));
        }
        if self.error_backoff_multiplier == 0 {
            return Err(ConfigError::Zero("error backoff multiplier"));
        }

        let window = self
            .windows
            .narrowest_window()
            .to_std()
            .map_err(|_| ConfigError::Zero("notification window"))?;
        if window.is_zero() {
            return Err(ConfigError::Zero("notification window"));
        }
        if self.interval > window {
            return Err(ConfigError::IntervalExceedsWindow {
                interval: self.interval,
                window,
            });
        }
        Ok(())
    }
}

// =============================================================================
// SweeperConfig
// =============================================================================

/// Retention sweeper configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Minimum age past `end_time` before a record is deleted
    pub grace_period: chrono::Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CLEANUP_INTERVAL,
            grace_period: chrono::Duration::seconds(DEFAULT_RETENTION_GRACE_SECS),
        }
    }
}

impl SweeperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `CLEANUP_INTERVAL_SECS`: Time between sweeps (default: 3600)
    /// - `RETENTION_GRACE_SECS`: Grace period after an event ends (default: 86400)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = env_u64("CLEANUP_INTERVAL_SECS")? {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("RETENTION_GRACE_SECS")? {
            let secs = i64::try_from(secs).map_err(|_| ConfigError::InvalidValue {
                name: "RETENTION_GRACE_SECS",
                value: secs.to_string(),
            })?;
            config.grace_period = chrono::Duration::try_seconds(secs).ok_or(
                ConfigError::InvalidValue {
                    name: "RETENTION_GRACE_SECS",
                    value: secs.to_string(),
                },
            )?;
        }
        Ok(config)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace_period: chrono::Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Reject a grace period that could delete records the scheduler has not
    /// caught up on after an error backoff
    pub fn validate(&self, scheduler: &SchedulerConfig) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::Zero("cleanup interval"));
        }

        let backoff = scheduler.error_backoff();
        let grace = self.grace_period.to_std().unwrap_or(Duration::ZERO);
        if grace < backoff {
            return Err(ConfigError::GraceShorterThanBackoff { grace, backoff });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(20));
        assert_eq!(config.error_backoff(), Duration::from_secs(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scheduler_rejects_interval_wider_than_window() {
        let config = SchedulerConfig::new().with_interval(Duration::from_secs(90));
        assert_eq!(
            config.validate(),
            Err(ConfigError::IntervalExceedsWindow {
                interval: Duration::from_secs(90),
                window: Duration::from_secs(60),
            })
        );
    }

    #[test]
    fn test_scheduler_rejects_zero_values() {
        assert!(SchedulerConfig::new()
            .with_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(SchedulerConfig::new()
            .with_error_backoff_multiplier(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_sweeper_defaults() {
        let config = SweeperConfig::default();
        assert_eq!(config.interval, Duration::from_secs(3600));
        assert_eq!(config.grace_period, chrono::Duration::days(1));
        assert!(config.validate(&SchedulerConfig::default()).is_ok());
    }

    #[test]
    fn test_sweeper_rejects_grace_shorter_than_backoff() {
        let config = SweeperConfig::new().with_grace_period(chrono::Duration::seconds(30));
        assert!(matches!(
            config.validate(&SchedulerConfig::default()),
            Err(ConfigError::GraceShorterThanBackoff { .. })
        ));
    }
}
