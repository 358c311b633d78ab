//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while framing or reassembling a transfer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload exceeds the configured maximum.
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Failed to serialize or parse the JSON payload.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A header line was not `LEN:<n>` or `TIME:<epoch>`.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// No newline terminating the header was found.
    #[error("incomplete header")]
    IncompleteHeader,

    /// Fewer body bytes than announced.
    #[error("incomplete message: expected {expected} bytes, got {received}")]
    IncompleteMessage { expected: usize, received: usize },

    /// More body bytes than announced.
    #[error("unexpected data after message: expected {expected} bytes, got {received}")]
    TrailingData { expected: usize, received: usize },
}
