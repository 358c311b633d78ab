//! Raw calendar events, the condenser, and calendar providers.
//!
//! This crate provides everything between the calendar service and the
//! display record:
//!
//! - [`CalendarProvider`] - The trait calendar sources implement
//! - [`RawEvent`] - Explicit schema of the service's event resource
//! - [`condense_events`] - Pure conversion to [`inkcal_core::CondensedEvent`]
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │ Microsoft Graph │    │   events.json   │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │  GraphProvider  │    │  FileProvider   │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │   CalendarProvider   │
//!          └──────────┬───────────┘
//!                     │
//!                     ▼
//!              ┌─────────────┐
//!              │  RawEvent   │
//!              └──────┬──────┘
//!                     │
//!                     ▼ condense_events()
//!              ┌─────────────────┐
//!              │ CondensedEvent  │
//!              └─────────────────┘
//! ```

pub mod condense;
pub mod error;
#[cfg(feature = "graph")]
pub mod graph;
pub mod provider;
pub mod raw_event;

// Re-export main types at crate root
pub use condense::{CondenseError, CondenseResult, condense_event, condense_events};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{BoxFuture, CalendarProvider, FileProvider, parse_event_dump};
pub use raw_event::{
    AttendeeType, EventType, RawAttendee, RawDateTime, RawEvent, RawResponse, ResponseStatus,
};
