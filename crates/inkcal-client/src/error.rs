//! Client error types.
//!
//! Every failure of a run ends up here and is mapped to the process exit
//! code by [`ClientError::exit_code`].

use std::path::PathBuf;

use inkcal_ble::BleError;
use inkcal_core::TimeError;
use inkcal_protocol::ProtocolError;
use inkcal_providers::{CondenseError, ProviderError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fetching raw events failed.
    #[error("fetch failed: {0}")]
    Provider(#[from] ProviderError),

    /// A raw event could not be condensed.
    #[error(transparent)]
    Condense(#[from] CondenseError),

    /// Framing or parsing the condensed payload failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Discovery or transfer failed.
    #[error("transfer failed: {0}")]
    Ble(#[from] BleError),

    /// Invalid timezone.
    #[error(transparent)]
    Time(#[from] TimeError),

    /// `--skip-fetch` was given but there is nothing to send.
    #[error("condensed file not found: {}", .0.display())]
    MissingCondensedFile(PathBuf),

    /// The user interrupted the run.
    #[error("interrupted")]
    Interrupted,

    /// The condensed file could not be written or parsed.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Returns the process exit code for this error.
    ///
    /// `2` is reserved for a missing condensed file, `130` for an interrupt,
    /// every other failure is `1`.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingCondensedFile(_) => 2,
            Self::Interrupted => 130,
            Self::Ble(err) if err.is_interrupted() => 130,
            _ => 1,
        }
    }
}
