//! Peripheral discovery and chunked transfer to the display.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │  discovery   │   │    policy    │   │     transmit     │
//! │              │   │              │   │                  │
//! │ name prefix/ │   │ combined or  │   │ TIME → LEN →     │
//! │ service scan │   │ split, acks, │   │ chunks, progress │
//! │              │   │ pacing       │   │ and cancellation │
//! └──────┬───────┘   └──────────────┘   └────────┬─────────┘
//!        │                                       │
//!        └──────────────┬────────────────────────┘
//!                       ▼
//!               Radio / Link traits
//!                       │
//!                       ▼
//!             btleplug (feature "btleplug")
//! ```
//!
//! # Example
//!
//! ```ignore
//! let radio = BtleRadio::first_adapter().await?;
//! let display = discover(&radio, &DiscoveryConfig::default()).await?;
//! let frame = Frame::encode(&events, DEFAULT_MAX_PAYLOAD)?;
//! Transmitter::new(TransferSettings::default())
//!     .send(&radio, &display, &GattTarget::default(), Transfer::Frame { frame: &frame, time: None })
//!     .await?;
//! ```

#[cfg(feature = "btleplug")]
pub mod btle;
pub mod discovery;
pub mod error;
pub mod policy;
pub mod radio;
#[cfg(test)]
pub(crate) mod testing;
pub mod transmit;

#[cfg(feature = "btleplug")]
pub use btle::BtleRadio;
pub use discovery::{DiscoveryConfig, discover, observed_listing};
pub use error::{BleError, BleResult};
pub use policy::{Thresholds, TransferMode, TransferPolicy, TransferSettings, resolve_policy};
pub use radio::{
    BoxFuture, CharacteristicInfo, DEFAULT_CHARACTERISTIC_UUID, DEFAULT_SERVICE_UUID, GattTarget,
    Link, PeripheralHandle, Radio, WriteMode,
};
pub use transmit::{Progress, Transfer, TransferReport, TransferState, Transmitter};
