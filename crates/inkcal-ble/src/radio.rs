//! Radio abstraction.
//!
//! [`Radio`] and [`Link`] are the seam between the transfer logic and the
//! Bluetooth stack. The btleplug backend implements them for real hardware;
//! tests use an in-memory radio that records every write.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use uuid::Uuid;

use crate::error::BleResult;

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Nordic UART service, advertised by the display firmware.
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e);

/// Nordic UART RX characteristic, the one the host writes to.
pub const DEFAULT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e);

/// A peripheral seen during a scan, or named by address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeripheralHandle {
    /// Platform address, `AA:BB:CC:DD:EE:FF` on Linux and Windows.
    pub address: String,
    /// Advertised local name.
    pub name: Option<String>,
    /// Advertised service UUIDs.
    pub services: Vec<Uuid>,
    /// Signal strength at scan time.
    pub rssi: Option<i16>,
}

impl PeripheralHandle {
    /// A handle known only by address, as when the address is configured.
    pub fn from_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Returns true if the peripheral advertises `service`.
    pub fn advertises(&self, service: &Uuid) -> bool {
        self.services.contains(service)
    }
}

impl fmt::Display for PeripheralHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.address),
            None => write!(f, "<unnamed> ({})", self.address),
        }
    }
}

/// Service and characteristic the payload is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattTarget {
    pub service: Uuid,
    pub characteristic: Uuid,
}

impl Default for GattTarget {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE_UUID,
            characteristic: DEFAULT_CHARACTERISTIC_UUID,
        }
    }
}

/// What a backend knows about one discovered characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicInfo {
    pub uuid: Uuid,
    pub service: Uuid,
    /// Supports write with or without response.
    pub writable: bool,
}

impl GattTarget {
    /// Picks the characteristic to write to.
    ///
    /// The configured characteristic wins when it is writable. Otherwise the
    /// first writable characteristic of the configured service is used.
    pub fn select<'a>(&self, candidates: &'a [CharacteristicInfo]) -> Option<&'a CharacteristicInfo> {
        candidates
            .iter()
            .find(|c| c.writable && c.uuid == self.characteristic)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|c| c.writable && c.service == self.service)
            })
    }
}

/// Acknowledgment mode of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Write request; completes once the peripheral acknowledged it.
    WithResponse,
    /// Write command; completes once queued locally.
    WithoutResponse,
}

/// A Bluetooth adapter able to scan and connect.
pub trait Radio: Send + Sync {
    /// Scans for `window` and returns every peripheral seen.
    fn scan(&self, window: Duration) -> BoxFuture<'_, BleResult<Vec<PeripheralHandle>>>;

    /// Connects to `peripheral` and resolves the write characteristic.
    fn connect<'a>(
        &'a self,
        peripheral: &'a PeripheralHandle,
        target: &'a GattTarget,
    ) -> BoxFuture<'a, BleResult<Box<dyn Link>>>;
}

/// An open connection with a resolved write characteristic.
///
/// Writes are strictly sequential: `write` takes `&mut self`.
pub trait Link: Send {
    /// Writes `data` to the characteristic.
    fn write<'a>(&'a mut self, data: &'a [u8], mode: WriteMode) -> BoxFuture<'a, BleResult<()>>;

    /// Closes the connection.
    fn disconnect(&mut self) -> BoxFuture<'_, BleResult<()>>;
}
