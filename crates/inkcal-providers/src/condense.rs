//! RawEvent to CondensedEvent conversion.
//!
//! Condensing is pure and keeps the service order: one [`CondensedEvent`] per
//! [`RawEvent`]. The steps are:
//! 1. Convert `start`/`end` to the configured local zone
//! 2. Tally attendees by invitation type and response
//! 3. Strip virtual-meeting phrases from the location
//! 4. Derive the recurring/moved flags from the series fields
//!
//! Cancelled events are kept; the display greys them out itself.

use inkcal_core::{AttendeeCounts, CondensedEvent, LocalZone, TimeError, normalize_location};
use thiserror::Error;
use tracing::debug;

use crate::raw_event::{AttendeeType, EventType, RawEvent, ResponseStatus};

/// Errors raised while condensing.
#[derive(Debug, Error)]
pub enum CondenseError {
    /// A `start` or `end` timestamp could not be parsed. Aborts the run.
    #[error("event #{index}: malformed {field} timestamp")]
    MalformedTimestamp {
        index: usize,
        field: &'static str,
        #[source]
        source: TimeError,
    },
}

/// A specialized Result type for condensing.
pub type CondenseResult<T> = Result<T, CondenseError>;

/// Condenses a single event. `index` is only used for error context.
pub fn condense_event(
    raw: &RawEvent,
    index: usize,
    zone: &LocalZone,
) -> CondenseResult<CondensedEvent> {
    let malformed = |field: &'static str| {
        move |source: TimeError| CondenseError::MalformedTimestamp {
            index,
            field,
            source,
        }
    };

    let start = zone
        .format_local(raw.start_time())
        .map_err(malformed("start"))?;
    let end = zone.format_local(raw.end_time()).map_err(malformed("end"))?;
    let date = start
        .as_deref()
        .and_then(|s| s.get(..10))
        .unwrap_or_default()
        .to_string();

    Ok(CondensedEvent {
        date,
        start,
        end,
        subject: raw.subject.clone(),
        organizer: raw.organizer_name().map(str::to_string),
        location: raw.location_name().map(normalize_location),
        importance: raw.importance.clone(),
        has_attachments: raw.has_attachments,
        is_online_meeting: raw.is_online_meeting,
        is_recurring: is_recurring(raw),
        is_moved: is_moved(raw),
        is_cancelled: raw.is_cancelled,
        num_of: count_attendees(raw),
    })
}

/// Condenses every event, preserving order. The first malformed timestamp
/// aborts the whole batch.
pub fn condense_events(raw_events: &[RawEvent], zone: &LocalZone) -> CondenseResult<Vec<CondensedEvent>> {
    let condensed = raw_events
        .iter()
        .enumerate()
        .map(|(index, raw)| condense_event(raw, index, zone))
        .collect::<CondenseResult<Vec<_>>>()?;
    debug!(count = condensed.len(), zone = %zone, "condensed events");
    Ok(condensed)
}

/// Part of a series, either as the master or as an instance of one.
fn is_recurring(raw: &RawEvent) -> bool {
    raw.has_recurrence() || raw.has_series_master()
}

/// An instance that no longer sits where the series pattern put it.
fn is_moved(raw: &RawEvent) -> bool {
    raw.has_series_master() && (raw.event_type == EventType::Exception || raw.has_original_start())
}

fn count_attendees(raw: &RawEvent) -> AttendeeCounts {
    raw.attendees
        .iter()
        .fold(AttendeeCounts::default(), |mut counts, attendee| {
            match attendee.attendee_type {
                AttendeeType::Required => counts.required += 1,
                AttendeeType::Optional => counts.optional += 1,
                AttendeeType::Resource | AttendeeType::Unknown => {}
            }
            match attendee.status.response {
                ResponseStatus::Accepted => counts.accepted += 1,
                ResponseStatus::Declined => counts.declined += 1,
                status if status.is_pending() => counts.not_responded += 1,
                _ => {}
            }
            counts
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_event::RawAttendee;

    fn berlin() -> LocalZone {
        LocalZone::default()
    }

    fn sample_raw_event() -> RawEvent {
        RawEvent::new("2025-09-11T11:00:00.0000000", "2025-09-11T11:30:00.0000000")
            .with_subject("Sprint Review")
            .with_organizer("Jordis Example")
            .with_location("Microsoft Teams Meeting Room 5")
    }

    mod time_conversion {
        use super::*;

        #[test]
        fn converts_to_local_zone() {
            let event = condense_event(&sample_raw_event(), 0, &berlin()).unwrap();
            assert_eq!(event.start.as_deref(), Some("2025-09-11T13:00:00+0200"));
            assert_eq!(event.end.as_deref(), Some("2025-09-11T13:30:00+0200"));
            assert_eq!(event.date, "2025-09-11");
        }

        #[test]
        fn date_follows_local_day() {
            let raw = RawEvent::new("2025-01-15T23:30:00.0000000", "2025-01-16T00:30:00.0000000");
            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert_eq!(event.date, "2025-01-16");
            assert_eq!(event.start.as_deref(), Some("2025-01-16T00:30:00+0100"));
        }

        #[test]
        fn missing_start_leaves_date_empty() {
            let raw = RawEvent {
                end: Some(crate::raw_event::RawDateTime::utc("2025-09-11T11:30:00")),
                ..Default::default()
            };
            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert_eq!(event.date, "");
            assert!(event.start.is_none());
            assert!(event.end.is_some());
        }

        #[test]
        fn malformed_timestamp_aborts_batch() {
            let events = vec![
                sample_raw_event(),
                RawEvent::new("2025-09-11T11:00:00", "11.09.2025 11:30"),
            ];
            let err = condense_events(&events, &berlin()).unwrap_err();
            assert!(matches!(
                err,
                CondenseError::MalformedTimestamp {
                    index: 1,
                    field: "end",
                    ..
                }
            ));
        }
    }

    mod fields {
        use super::*;

        #[test]
        fn strips_virtual_meeting_location() {
            let event = condense_event(&sample_raw_event(), 0, &berlin()).unwrap();
            assert_eq!(event.location.as_deref(), Some("Room 5"));
        }

        #[test]
        fn missing_location_stays_missing() {
            let raw = RawEvent::new("2025-09-11T11:00:00", "2025-09-11T11:30:00");
            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert!(event.location.is_none());
            assert!(event.subject.is_none());
            assert!(event.organizer.is_none());
        }

        #[test]
        fn copies_flags() {
            let mut raw = sample_raw_event();
            raw.has_attachments = true;
            raw.is_online_meeting = true;
            raw.is_cancelled = true;
            raw.importance = Some("high".to_string());

            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert!(event.has_attachments);
            assert!(event.is_online_meeting);
            assert!(event.is_cancelled);
            assert_eq!(event.importance.as_deref(), Some("high"));
        }

        #[test]
        fn snapshot() {
            let raw = sample_raw_event()
                .with_attendee(RawAttendee::new(AttendeeType::Required, ResponseStatus::Accepted))
                .with_attendee(RawAttendee::new(AttendeeType::Optional, ResponseStatus::None));
            let event = condense_event(&raw, 0, &berlin()).unwrap();

            insta::assert_json_snapshot!(event, @r###"
            {
              "date": "2025-09-11",
              "start": "2025-09-11T13:00:00+0200",
              "end": "2025-09-11T13:30:00+0200",
              "subject": "Sprint Review",
              "organizer": "Jordis Example",
              "location": "Room 5",
              "importance": null,
              "hasAttachments": false,
              "isOnlineMeeting": false,
              "isRecurring": false,
              "isMoved": false,
              "isCancelled": false,
              "numOf": {
                "required": 1,
                "optional": 1,
                "accepted": 1,
                "declined": 0,
                "notResponded": 1
              }
            }
            "###);
        }
    }

    mod series {
        use super::*;

        #[test]
        fn moved_occurrence_is_recurring_and_moved() {
            let raw = sample_raw_event()
                .with_series_master("AAMkSeries")
                .with_original_start("2025-09-10T11:00:00Z");
            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert!(event.is_recurring);
            assert!(event.is_moved);
        }

        #[test]
        fn exception_without_original_start_is_moved() {
            let raw = sample_raw_event()
                .with_series_master("AAMkSeries")
                .with_type(EventType::Exception);
            assert!(condense_event(&raw, 0, &berlin()).unwrap().is_moved);
        }

        #[test]
        fn plain_occurrence_is_not_moved() {
            let raw = sample_raw_event()
                .with_series_master("AAMkSeries")
                .with_type(EventType::Occurrence);
            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert!(event.is_recurring);
            assert!(!event.is_moved);
        }

        #[test]
        fn recurrence_pattern_only_is_recurring_not_moved() {
            let raw = sample_raw_event()
                .with_recurrence(serde_json::json!({"pattern": {"type": "weekly"}}))
                .with_original_start("2025-09-10T11:00:00Z");
            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert!(event.is_recurring);
            assert!(!event.is_moved);
        }

        #[test]
        fn empty_recurrence_list_is_not_recurring() {
            let raw = sample_raw_event().with_recurrence(serde_json::json!([]));
            let event = condense_event(&raw, 0, &berlin()).unwrap();
            assert!(!event.is_recurring);
        }

        #[test]
        fn single_event_is_neither() {
            let event = condense_event(&sample_raw_event(), 0, &berlin()).unwrap();
            assert!(!event.is_recurring);
            assert!(!event.is_moved);
        }
    }

    mod attendees {
        use super::*;

        #[test]
        fn partitions_by_type_and_response() {
            let raw = sample_raw_event()
                .with_attendee(RawAttendee::new(AttendeeType::Required, ResponseStatus::Accepted))
                .with_attendee(RawAttendee::new(AttendeeType::Required, ResponseStatus::Declined))
                .with_attendee(RawAttendee::new(AttendeeType::Optional, ResponseStatus::NotResponded))
                .with_attendee(RawAttendee::new(AttendeeType::Required, ResponseStatus::None))
                .with_attendee(RawAttendee::new(AttendeeType::Resource, ResponseStatus::Accepted));

            let counts = condense_event(&raw, 0, &berlin()).unwrap().num_of;
            assert_eq!(counts.required, 3);
            assert_eq!(counts.optional, 1);
            assert_eq!(counts.accepted, 2);
            assert_eq!(counts.declined, 1);
            assert_eq!(counts.not_responded, 2);
            assert_eq!(counts.responses() as usize, raw.attendees.len());
        }

        #[test]
        fn tentative_and_organizer_are_not_counted() {
            let raw = sample_raw_event()
                .with_attendee(RawAttendee::new(
                    AttendeeType::Required,
                    ResponseStatus::TentativelyAccepted,
                ))
                .with_attendee(RawAttendee::new(AttendeeType::Required, ResponseStatus::Organizer));
            let counts = condense_event(&raw, 0, &berlin()).unwrap().num_of;
            assert_eq!(counts.required, 2);
            assert_eq!(counts.responses(), 0);
        }
    }

    mod batch {
        use super::*;

        #[test]
        fn preserves_length_and_order() {
            let events: Vec<_> = ["First", "Second", "Third"]
                .into_iter()
                .map(|subject| sample_raw_event().with_subject(subject))
                .collect();
            let condensed = condense_events(&events, &berlin()).unwrap();

            let subjects: Vec<_> = condensed
                .iter()
                .map(|e| e.subject.as_deref().unwrap())
                .collect();
            assert_eq!(subjects, ["First", "Second", "Third"]);
        }

        #[test]
        fn keeps_cancelled_events() {
            let mut cancelled = sample_raw_event();
            cancelled.is_cancelled = true;
            let condensed = condense_events(&[cancelled, sample_raw_event()], &berlin()).unwrap();
            assert_eq!(condensed.len(), 2);
            assert!(condensed[0].is_cancelled);
        }

        #[test]
        fn is_idempotent() {
            let events = vec![sample_raw_event(), RawEvent::default()];
            let first = condense_events(&events, &berlin()).unwrap();
            let second = condense_events(&events, &berlin()).unwrap();
            assert_eq!(first, second);
        }

        #[test]
        fn empty_input_gives_empty_output() {
            assert!(condense_events(&[], &berlin()).unwrap().is_empty());
        }
    }
}
