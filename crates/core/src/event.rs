// Event records and notification flags
//
// An EventRecord is one CTF event in one owner's agenda. It is keyed by
// (owner_id, name) and carries one "sent" flag per NotificationKind.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Chat user id of the agenda owner (Discord snowflake)
pub type OwnerId = u64;

// ============================================================================
// NotificationKind
// ============================================================================

/// The four time-based notifications an event can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Fires shortly before the event starts
    Reminder,
    /// Fires when the event starts
    GoodLuck,
    /// Fires shortly before the event ends
    EndingSoon,
    /// Fires once the event has ended
    Congratulations,
}

impl NotificationKind {
    /// All kinds in evaluation order
    pub const ALL: [NotificationKind; 4] = [
        NotificationKind::Reminder,
        NotificationKind::GoodLuck,
        NotificationKind::EndingSoon,
        NotificationKind::Congratulations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::GoodLuck => "good_luck",
            Self::EndingSoon => "ending_soon",
            Self::Congratulations => "congratulations",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// NotificationFlags
// ============================================================================

/// Which notifications were already delivered for an event
///
/// Flags only ever go from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlags {
    pub reminder: bool,
    pub good_luck: bool,
    pub ending_soon: bool,
    pub congratulations: bool,
}

impl NotificationFlags {
    pub fn is_sent(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Reminder => self.reminder,
            NotificationKind::GoodLuck => self.good_luck,
            NotificationKind::EndingSoon => self.ending_soon,
            NotificationKind::Congratulations => self.congratulations,
        }
    }

    pub fn set(&mut self, kind: NotificationKind, value: bool) {
        match kind {
            NotificationKind::Reminder => self.reminder = value,
            NotificationKind::GoodLuck => self.good_luck = value,
            NotificationKind::EndingSoon => self.ending_soon = value,
            NotificationKind::Congratulations => self.congratulations = value,
        }
    }
}

// ============================================================================
// NewEvent
// ============================================================================

/// Insert payload for an event, before it is attached to an owner
///
/// Build it with struct syntax and call [`NewEvent::validate`] before handing it
/// to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub source_url: Option<String>,
    pub site_url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub format: Option<String>,
    pub organizers: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub participant_count: Option<i64>,
}

impl NewEvent {
    /// Minimal event with only the required fields set
    pub fn new(name: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            source_url: None,
            site_url: None,
            start_time,
            end_time,
            format: None,
            organizers: None,
            description: None,
            weight: None,
            participant_count: None,
        }
    }

    /// Check the record invariants: non-empty name and `start_time < end_time`
    /// at the millisecond precision records are kept in
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.start_time.trunc_subsecs(3) >= self.end_time.trunc_subsecs(3) {
            return Err(ValidationError::StartNotBeforeEnd {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(self)
    }

    /// Attach the event to an owner with all notification flags cleared
    ///
    /// Instants are truncated to millisecond precision, the resolution every
    /// store persists.
    pub fn into_record(self, owner_id: OwnerId) -> EventRecord {
        EventRecord {
            owner_id,
            name: self.name,
            source_url: self.source_url,
            site_url: self.site_url,
            start_time: self.start_time.trunc_subsecs(3),
            end_time: self.end_time.trunc_subsecs(3),
            format: self.format,
            organizers: self.organizers,
            description: self.description,
            weight: self.weight,
            participant_count: self.participant_count,
            flags: NotificationFlags::default(),
        }
    }
}

// ============================================================================
// EventRecord
// ============================================================================

/// A stored event in an owner's agenda
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub owner_id: OwnerId,
    pub name: String,
    pub source_url: Option<String>,
    pub site_url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub format: Option<String>,
    pub organizers: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub participant_count: Option<i64>,
    pub flags: NotificationFlags,
}

impl EventRecord {
    /// Copy of the event payload without owner or flags (used when sharing)
    pub fn to_new_event(&self) -> NewEvent {
        NewEvent {
            name: self.name.clone(),
            source_url: self.source_url.clone(),
            site_url: self.site_url.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            format: self.format.clone(),
            organizers: self.organizers.clone(),
            description: self.description.clone(),
            weight: self.weight,
            participant_count: self.participant_count,
        }
    }
}
