//! Raw event type as returned by the calendar service.
//!
//! [`RawEvent`] mirrors the subset of the Microsoft Graph `event` resource
//! the display needs. Every field is optional on the wire; the defaults are:
//!
//! | field | default |
//! |---|---|
//! | `start`, `end`, `subject`, `organizer`, `location`, `importance` | absent |
//! | `attendees` | empty |
//! | `recurrence`, `seriesMasterId`, `originalStart` | absent |
//! | `type` | [`EventType::Unknown`] |
//! | `hasAttachments`, `isOnlineMeeting`, `isCancelled` | `false` |
//!
//! Unknown enum values deserialize to an `Unknown` variant instead of
//! failing, so a new Graph value never breaks a fetch.

use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A `dateTimeTimeZone` value.
///
/// `date_time` is kept as the raw string (`2025-09-11T11:00:00.0000000`);
/// parsing happens during condensation so a malformed value is reported
/// with context instead of failing the whole deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDateTime {
    pub date_time: Option<String>,
    /// Zone the service expressed `date_time` in. `calendarView` without a
    /// `Prefer: outlook.timezone` header always reports `UTC`.
    pub time_zone: Option<String>,
}

impl RawDateTime {
    /// Creates a UTC value from a service timestamp string.
    pub fn utc(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            time_zone: Some("UTC".to_string()),
        }
    }
}

/// An `emailAddress` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEmailAddress {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// A `recipient` value (used for the organizer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecipient {
    pub email_address: Option<RawEmailAddress>,
}

/// A `location` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLocation {
    pub display_name: Option<String>,
}

/// How an attendee was invited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttendeeType {
    Required,
    Optional,
    /// A room or piece of equipment.
    Resource,
    #[default]
    #[serde(other)]
    Unknown,
}

/// An attendee's answer to the invitation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    /// No response information at all; treated as "not responded yet".
    None,
    Organizer,
    TentativelyAccepted,
    Accepted,
    Declined,
    NotResponded,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ResponseStatus {
    /// Returns true for statuses counted as "has not answered".
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::NotResponded | Self::None)
    }
}

/// A `responseStatus` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResponse {
    pub response: ResponseStatus,
    pub time: Option<String>,
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawAttendee {
    #[serde(rename = "type")]
    pub attendee_type: AttendeeType,
    pub status: RawResponse,
    pub email_address: Option<RawEmailAddress>,
}

impl RawAttendee {
    /// Creates an attendee with the given invitation type and answer.
    pub fn new(attendee_type: AttendeeType, response: ResponseStatus) -> Self {
        Self {
            attendee_type,
            status: RawResponse {
                response,
                time: None,
            },
            email_address: None,
        }
    }
}

/// Kind of event within a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    SingleInstance,
    Occurrence,
    /// An occurrence that was modified off the series pattern.
    Exception,
    SeriesMaster,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A raw calendar event from the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    pub id: Option<String>,
    pub start: Option<RawDateTime>,
    pub end: Option<RawDateTime>,
    pub subject: Option<String>,
    pub organizer: Option<RawRecipient>,
    pub location: Option<RawLocation>,
    #[serde(deserialize_with = "null_as_default")]
    pub attendees: Vec<RawAttendee>,

    /// The recurrence pattern; only set on series masters. Kept opaque since
    /// only its presence matters here.
    pub recurrence: Option<serde_json::Value>,
    pub series_master_id: Option<String>,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub event_type: EventType,
    /// Start of the occurrence before it was moved.
    pub original_start: Option<String>,

    pub importance: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub has_attachments: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_online_meeting: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_cancelled: bool,
}

impl RawEvent {
    /// Creates an event with UTC start and end timestamps.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(RawDateTime::utc(start)),
            end: Some(RawDateTime::utc(end)),
            ..Default::default()
        }
    }

    /// Raw start timestamp, if any.
    pub fn start_time(&self) -> Option<&str> {
        self.start.as_ref().and_then(|t| t.date_time.as_deref())
    }

    /// Raw end timestamp, if any.
    pub fn end_time(&self) -> Option<&str> {
        self.end.as_ref().and_then(|t| t.date_time.as_deref())
    }

    /// Organizer display name, if any.
    pub fn organizer_name(&self) -> Option<&str> {
        self.organizer
            .as_ref()
            .and_then(|o| o.email_address.as_ref())
            .and_then(|e| e.name.as_deref())
    }

    /// Location display name, if any.
    pub fn location_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .and_then(|l| l.display_name.as_deref())
    }

    /// Returns true when a recurrence pattern is attached.
    ///
    /// Empty values (`null`, `false`, `0`, `""`, `[]`, `{}`) count as "no pattern".
    pub fn has_recurrence(&self) -> bool {
        use serde_json::Value;

        match &self.recurrence {
            None | Some(Value::Null) => false,
            Some(Value::Bool(set)) => *set,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
        }
    }

    /// Returns true when the event references a series master.
    pub fn has_series_master(&self) -> bool {
        self.series_master_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }

    /// Returns true when an original start is recorded.
    pub fn has_original_start(&self) -> bool {
        self.original_start
            .as_deref()
            .is_some_and(|s| !s.is_empty())
    }

    /// Builder method to set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Builder method to set the organizer's display name.
    pub fn with_organizer(mut self, name: impl Into<String>) -> Self {
        self.organizer = Some(RawRecipient {
            email_address: Some(RawEmailAddress {
                name: Some(name.into()),
                address: None,
            }),
        });
        self
    }

    /// Builder method to set the location display name.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(RawLocation {
            display_name: Some(location.into()),
        });
        self
    }

    /// Builder method to add an attendee.
    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    /// Builder method to set the series master reference.
    pub fn with_series_master(mut self, id: impl Into<String>) -> Self {
        self.series_master_id = Some(id.into());
        self
    }

    /// Builder method to set the original start.
    pub fn with_original_start(mut self, original_start: impl Into<String>) -> Self {
        self.original_start = Some(original_start.into());
        self
    }

    /// Builder method to set the event type.
    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    /// Builder method to attach a recurrence pattern.
    pub fn with_recurrence(mut self, recurrence: serde_json::Value) -> Self {
        self.recurrence = Some(recurrence);
        self
    }
}
