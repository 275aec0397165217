// Chat message rendering
//
// Messages are platform-neutral embeds (title, description, colour, fields).
// Timestamps use Discord's `<t:unix:style>` markup, which clients render in
// the reader's own timezone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{EventRecord, NotificationKind};

const REMINDER_COLOR: u32 = 0xFFCC00;
const GOOD_LUCK_COLOR: u32 = 0x00FF00;
const ENDING_SOON_COLOR: u32 = 0xFFA500;
const CONGRATULATIONS_COLOR: u32 = 0x006400;
pub const AGENDA_COLOR: u32 = 0x00FFFF;

/// A single embed field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Rendered chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<MessageField>,
}

impl Message {
    pub fn new(title: impl Into<String>, description: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(MessageField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Discord timestamp markup, e.g. `<t:1678886400:F>`
///
/// Styles: `t`/`T` time, `d`/`D` date, `f`/`F` date and time, `R` relative.
pub fn discord_timestamp(at: DateTime<Utc>, style: char) -> String {
    format!("<t:{}:{}>", at.timestamp(), style)
}

/// Render the notification for `kind` about `record`
pub fn notification_message(kind: NotificationKind, record: &EventRecord) -> Message {
    let link = record.source_url.clone().unwrap_or_else(|| "N/A".to_string());

    match kind {
        NotificationKind::Reminder => Message::new(
            format!("🚨 CTF Reminder: {}", record.name),
            format!(
                "This event starts in about 1 hour: {} ({})!",
                discord_timestamp(record.start_time, 'R'),
                discord_timestamp(record.start_time, 'F'),
            ),
            REMINDER_COLOR,
        )
        .with_field("Event Link", link, false),
        NotificationKind::GoodLuck => Message::new(
            format!("🍀 Good Luck For: {}", record.name),
            format!(
                "This event has just started and runs until: {} ({}).",
                discord_timestamp(record.end_time, 'F'),
                discord_timestamp(record.end_time, 'R'),
            ),
            GOOD_LUCK_COLOR,
        )
        .with_field("Event Link", link, false),
        NotificationKind::EndingSoon => Message::new(
            format!("⏰ Ending Soon: {}", record.name),
            format!(
                "This event ends in about 1 hour: {} ({})! Submit your flags!",
                discord_timestamp(record.end_time, 'R'),
                discord_timestamp(record.end_time, 'F'),
            ),
            ENDING_SOON_COLOR,
        )
        .with_field("Event Link", link, false),
        NotificationKind::Congratulations => Message::new(
            format!("🎉 Congratulations For: {}", record.name),
            format!(
                "This event ended: {}. Well done!",
                discord_timestamp(record.end_time, 'F'),
            ),
            CONGRATULATIONS_COLOR,
        ),
    }
}

/// Message sent to a user when someone shares an event with them
pub fn shared_event_message(sharer_mention: &str, event_name: &str) -> Message {
    Message::new(
        "📅 Event Shared",
        format!("{} shared **{}** with you.", sharer_mention, event_name),
        AGENDA_COLOR,
    )
}
