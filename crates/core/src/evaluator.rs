//! Notification evaluator
//!
//! Decides which notification kinds are newly due for an event at a given
//! instant. The function is pure: it reads the record and the clock value it
//! is handed, and never mutates anything.
//!
//! ```text
//!        start-1h   start-1h+5m    start  start+1m       end-1h   end-1h+5m    end
//!   ────────┼──────────┼─────────────┼───────┼─────── … ─────┼────────┼─────────┼──────▶
//!           [ reminder )             [good_luck)             [ending_soon)      [congratulations ──▶
//! ```
//!
//! The narrow windows only make sense when the caller polls at least once per
//! window; once a window has passed unnoticed the notification is skipped.

use chrono::{DateTime, Duration, Utc};

use crate::event::{EventRecord, NotificationKind};

/// Trigger window configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationWindows {
    /// How long before start the reminder opens
    pub reminder_lead: Duration,
    /// How long the reminder window stays open
    pub reminder_window: Duration,
    /// How long the good-luck window stays open after start
    pub good_luck_window: Duration,
    /// How long before end the ending-soon window opens
    pub ending_soon_lead: Duration,
    /// How long the ending-soon window stays open
    pub ending_soon_window: Duration,
}

impl Default for NotificationWindows {
    fn default() -> Self {
        Self {
            reminder_lead: Duration::hours(1),
            reminder_window: Duration::minutes(5),
            good_luck_window: Duration::minutes(1),
            ending_soon_lead: Duration::hours(1),
            ending_soon_window: Duration::minutes(5),
        }
    }
}

impl NotificationWindows {
    /// The shortest bounded window; a poll interval longer than this can skip a kind entirely
    pub fn narrowest_window(&self) -> Duration {
        self.reminder_window
            .min(self.good_luck_window)
            .min(self.ending_soon_window)
    }

    /// Whether `kind` is inside its trigger window at `now`, ignoring flags
    pub fn in_window(&self, kind: NotificationKind, record: &EventRecord, now: DateTime<Utc>) -> bool {
        match kind {
            NotificationKind::Reminder => {
                let opens = record.start_time - self.reminder_lead;
                opens <= now && now < opens + self.reminder_window
            }
            NotificationKind::GoodLuck => {
                record.start_time <= now && now < record.start_time + self.good_luck_window
            }
            NotificationKind::EndingSoon => {
                let opens = record.end_time - self.ending_soon_lead;
                opens <= now && now < opens + self.ending_soon_window
            }
            NotificationKind::Congratulations => now >= record.end_time,
        }
    }
}

/// Notification kinds that are due for `record` at `now`
///
/// A kind is due when its flag is still unset and `now` is inside its window.
/// Kinds are independent, so a delayed evaluation can return several at once.
/// The result follows [`NotificationKind::ALL`] order.
pub fn due_notifications(
    record: &EventRecord,
    now: DateTime<Utc>,
    windows: &NotificationWindows,
) -> Vec<NotificationKind> {
    NotificationKind::ALL
        .into_iter()
        .filter(|kind| !record.flags.is_sent(*kind) && windows.in_window(*kind, record, now))
        .collect()
}
