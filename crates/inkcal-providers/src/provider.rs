//! CalendarProvider trait definition.
//!
//! A provider turns a [`TimeWindow`] into the raw events the service holds for
//! it, in service order. Authentication and paging are the provider's own
//! business; callers only see a complete list or a [`ProviderError`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use inkcal_core::TimeWindow;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

/// A boxed future for async trait methods.
///
/// Keeps [`CalendarProvider`] object-safe so the binary can pick a provider
/// at runtime.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core abstraction for calendar sources.
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g., "graph", "file").
    fn name(&self) -> &str;

    /// Fetches every event overlapping `window`, in service order.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures,
    /// or a response that does not parse.
    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;
}

/// On-disk shape of a saved calendar response.
///
/// Accepts either a raw Graph page (`{"value": [...]}`) or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventDump {
    Page { value: Vec<RawEvent> },
    List(Vec<RawEvent>),
}

impl EventDump {
    fn into_events(self) -> Vec<RawEvent> {
        match self {
            Self::Page { value } => value,
            Self::List(events) => events,
        }
    }
}

/// Parses a saved calendar response.
pub fn parse_event_dump(json: &str) -> ProviderResult<Vec<RawEvent>> {
    serde_json::from_str::<EventDump>(json)
        .map(EventDump::into_events)
        .map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse events: {}", e)).with_source(e)
        })
}

/// Reads raw events from a JSON file instead of the network.
///
/// The file is returned as stored; `window` is not applied, since a saved
/// response already reflects the window it was fetched with.
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalendarProvider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            debug!(
                path = %self.path.display(),
                start = %window.start_param(),
                "reading events file"
            );
            let content = std::fs::read_to_string(&self.path).map_err(|e| {
                ProviderError::io(format!("cannot read {}", self.path.display()), e)
                    .with_provider(self.name())
            })?;
            parse_event_dump(&content).map_err(|e| e.with_provider(self.name()))
        })
    }
}
