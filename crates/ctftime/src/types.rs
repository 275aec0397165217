// CTFtime API wire types

use chrono::{DateTime, Utc};
use ctfnotify_core::{CatalogError, NewEvent};
use serde::Deserialize;

/// `GET /events/{id}/` response body
///
/// Only `title`, `start` and `finish` are required; everything else is
/// optional because older events omit fields.
#[derive(Debug, Deserialize)]
pub(crate) struct CtftimeEvent {
    pub title: String,
    pub start: String,
    pub finish: String,
    #[serde(default)]
    pub ctftime_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub organizers: Option<Vec<CtftimeOrganizer>>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub participants: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CtftimeOrganizer {
    #[serde(default)]
    pub name: Option<String>,
}

/// Agenda key derived from a catalog title
pub(crate) fn event_name_from_title(title: &str) -> String {
    title.trim().replace(' ', "-").replace('"', "")
}

fn organizer_names(organizers: Option<&[CtftimeOrganizer]>) -> String {
    match organizers {
        Some(list) if !list.is_empty() => list
            .iter()
            .map(|o| o.name.as_deref().unwrap_or("Unknown"))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "Unknown".to_string(),
    }
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, CatalogError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CatalogError::InvalidData(format!("invalid {field} '{value}': {e}")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CtftimeEvent {
    pub(crate) fn into_new_event(self) -> Result<NewEvent, CatalogError> {
        let name = event_name_from_title(&self.title);
        if name.is_empty() {
            return Err(CatalogError::InvalidData("event has an empty title".to_string()));
        }

        let start = parse_timestamp("start", &self.start)?;
        let finish = parse_timestamp("finish", &self.finish)?;

        let mut event = NewEvent::new(name, start, finish);
        event.organizers = Some(organizer_names(self.organizers.as_deref()));
        event.source_url = non_empty(self.ctftime_url);
        event.site_url = non_empty(self.url);
        event.format = non_empty(self.format);
        event.weight = self.weight;
        event.description = non_empty(self.description);
        event.participant_count = self.participants;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_name_from_title() {
        assert_eq!(event_name_from_title("  DEF CON Quals 2025 "), "DEF-CON-Quals-2025");
        assert_eq!(event_name_from_title("The \"Best\" CTF"), "The-Best-CTF");
    }

    #[test]
    fn test_organizer_names() {
        let organizers = vec![
            CtftimeOrganizer {
                name: Some("justCatTheFish".to_string()),
            },
            CtftimeOrganizer { name: None },
        ];
        assert_eq!(
            organizer_names(Some(&organizers)),
            "justCatTheFish, Unknown"
        );
        assert_eq!(organizer_names(Some(&[])), "Unknown");
        assert_eq!(organizer_names(None), "Unknown");
    }

    #[test]
    fn test_into_new_event_converts_offsets_to_utc() {
        let raw: CtftimeEvent = serde_json::from_value(serde_json::json!({
            "title": "Midnight Sun CTF",
            "start": "2025-06-14T12:00:00+02:00",
            "finish": "2025-06-15T12:00:00+02:00",
            "url": "",
            "weight": 42.0
        }))
        .unwrap();

        let event = raw.into_new_event().unwrap();
        assert_eq!(event.name, "Midnight-Sun-CTF");
        assert_eq!(
            event.start_time,
            Utc.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap()
        );
        assert_eq!(event.site_url, None);
        assert_eq!(event.weight, Some(42.0));
        assert_eq!(event.organizers.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_into_new_event_rejects_bad_dates() {
        let raw: CtftimeEvent = serde_json::from_value(serde_json::json!({
            "title": "Broken",
            "start": "tomorrow",
            "finish": "2025-06-15T12:00:00+00:00"
        }))
        .unwrap();

        assert!(matches!(
            raw.into_new_event(),
            Err(CatalogError::InvalidData(_))
        ));
    }
}
