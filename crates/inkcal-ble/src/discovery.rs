//! Locating the display.
//!
//! With a configured address the scan is skipped entirely. Otherwise the
//! radio scans for a bounded window and the first peripheral whose name
//! starts with the configured prefix, or that advertises the configured
//! service, is used.

use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BleError, BleResult};
use crate::radio::{DEFAULT_SERVICE_UUID, PeripheralHandle, Radio};

/// Criteria for picking the display among nearby peripherals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Advertised name prefix. Empty disables name matching.
    pub name_prefix: String,
    /// Advertised service that identifies the display.
    pub service_uuid: Option<Uuid>,
    /// Known address; skips scanning.
    pub address: Option<String>,
    /// How long to scan.
    pub scan_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            name_prefix: Self::DEFAULT_NAME_PREFIX.to_string(),
            service_uuid: Some(DEFAULT_SERVICE_UUID),
            address: None,
            scan_timeout: Duration::from_secs(Self::DEFAULT_SCAN_TIMEOUT_SECS),
        }
    }
}

impl DiscoveryConfig {
    pub const DEFAULT_NAME_PREFIX: &'static str = "InkCal";

    pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 10;

    /// Returns true if `peripheral` satisfies the name or service criterion.
    pub fn matches(&self, peripheral: &PeripheralHandle) -> bool {
        let name_match = !self.name_prefix.is_empty()
            && peripheral
                .name
                .as_deref()
                .is_some_and(|name| name.starts_with(&self.name_prefix));
        let service_match = self
            .service_uuid
            .is_some_and(|service| peripheral.advertises(&service));
        name_match || service_match
    }
}

/// Finds the display.
///
/// # Errors
///
/// [`BleError::DiscoveryFailed`] with every peripheral seen when nothing
/// matched, or the radio's own error if scanning failed.
pub async fn discover(radio: &dyn Radio, config: &DiscoveryConfig) -> BleResult<PeripheralHandle> {
    if let Some(address) = config.address.as_deref().filter(|a| !a.is_empty()) {
        debug!(address, "using configured address, skipping scan");
        return Ok(PeripheralHandle::from_address(address));
    }

    debug!(
        prefix = %config.name_prefix,
        service = ?config.service_uuid,
        timeout = ?config.scan_timeout,
        "scanning for display"
    );
    let observed = radio.scan(config.scan_timeout).await?;

    match observed.iter().find(|p| config.matches(p)) {
        Some(found) => {
            info!(peripheral = %found, "found display");
            Ok(found.clone())
        }
        None => {
            debug!(seen = observed.len(), "no peripheral matched");
            Err(BleError::DiscoveryFailed { observed })
        }
    }
}

/// Renders the peripherals seen by a failed scan, one `name (address)` per line.
pub fn observed_listing(observed: &[PeripheralHandle]) -> String {
    if observed.is_empty() {
        return "No peripherals seen during scan.".to_string();
    }
    let mut listing = format!("Peripherals seen during scan ({}):", observed.len());
    for peripheral in observed {
        listing.push_str("\n  ");
        listing.push_str(&peripheral.to_string());
    }
    listing
}
