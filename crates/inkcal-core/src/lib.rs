//! Core types: condensed events, local time conversion, location cleanup, tracing

pub mod event;
pub mod location;
pub mod time;
pub mod tracing;

pub use event::{AttendeeCounts, CondensedEvent};
pub use location::{VIRTUAL_MEETING_PHRASES, normalize_location};
pub use time::{LOCAL_TIME_FORMAT, LocalZone, TimeError, TimeWindow};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
