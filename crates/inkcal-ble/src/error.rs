//! Error types for discovery and transfer.

use inkcal_protocol::ProtocolError;
use thiserror::Error;
use uuid::Uuid;

use crate::discovery::observed_listing;
use crate::radio::PeripheralHandle;

/// A specialized Result type for BLE operations.
pub type BleResult<T> = Result<T, BleError>;

/// Errors raised while locating the display or transferring to it.
///
/// Every variant is terminal for the current transfer; there is no retry
/// below the caller.
#[derive(Debug, Error)]
pub enum BleError {
    /// The host has no usable Bluetooth adapter.
    #[error("no bluetooth adapter available")]
    NoAdapter,

    /// The radio backend reported an error outside of a transfer step.
    #[error("bluetooth error: {0}")]
    Backend(String),

    /// The scan finished without a matching peripheral.
    #[error("no matching peripheral found. {}", observed_listing(.observed))]
    DiscoveryFailed { observed: Vec<PeripheralHandle> },

    /// Connecting to the peripheral failed, or the address is unknown.
    #[error("connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    /// Connected, but no characteristic to write to.
    #[error("no writable characteristic {characteristic} in service {service} on {address}")]
    CharacteristicNotFound {
        address: String,
        service: Uuid,
        characteristic: Uuid,
    },

    /// A write was rejected or timed out.
    #[error("write #{index} ({len} bytes) failed: {reason}")]
    Write {
        index: usize,
        len: usize,
        reason: String,
    },

    /// The transfer was cancelled by a shutdown signal.
    #[error("transfer interrupted")]
    Interrupted,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl BleError {
    /// Returns true when the transfer stopped because of a shutdown signal.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
