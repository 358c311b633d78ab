//! The condensed event record sent to the display.
//!
//! [`CondensedEvent`] is the only event shape that leaves the host: it is
//! written to `calendar-condensed.json` and, framed, pushed over BLE. The
//! firmware parses it with a fixed set of camelCase keys, so the serialized
//! field names and order are part of the wire contract.

use serde::{Deserialize, Serialize};

/// Attendee tallies for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeCounts {
    /// Attendees invited as required.
    pub required: u32,
    /// Attendees invited as optional.
    pub optional: u32,
    /// Attendees that accepted.
    pub accepted: u32,
    /// Attendees that declined.
    pub declined: u32,
    /// Attendees that have not answered yet.
    pub not_responded: u32,
}

impl AttendeeCounts {
    /// Sum of the three response buckets.
    pub fn responses(&self) -> u32 {
        self.accepted + self.declined + self.not_responded
    }
}

/// A minimal, display-ready calendar event.
///
/// `date`, `start` and `end` are already in the configured local zone.
/// `start <= end` is assumed, never checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CondensedEvent {
    /// Local date of the start (`YYYY-MM-DD`), empty when the start is unknown.
    pub date: String,
    /// Local start, `YYYY-MM-DDTHH:MM:SS±HHMM`.
    pub start: Option<String>,
    /// Local end, same format as `start`.
    pub end: Option<String>,
    pub subject: Option<String>,
    /// Display name of the organizer.
    pub organizer: Option<String>,
    /// Location with virtual-meeting phrases removed.
    pub location: Option<String>,
    /// Service importance value (`low`, `normal`, `high`).
    pub importance: Option<String>,
    pub has_attachments: bool,
    pub is_online_meeting: bool,
    pub is_recurring: bool,
    /// A single occurrence of a series that was moved off its pattern.
    pub is_moved: bool,
    pub is_cancelled: bool,
    pub num_of: AttendeeCounts,
}

impl CondensedEvent {
    /// One-line summary used for console output.
    pub fn summary_line(&self) -> String {
        format!(
            "{} | {} – {} | {}",
            self.date,
            self.start.as_deref().unwrap_or("-"),
            self.end.as_deref().unwrap_or("-"),
            self.subject.as_deref().unwrap_or("(no subject)"),
        )
    }

    /// Returns true when the event starts on the given local date.
    pub fn is_on(&self, date: &str) -> bool {
        !self.date.is_empty() && self.date == date
    }
}
