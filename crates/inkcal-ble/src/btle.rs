//! btleplug radio backend.
//!
//! Uses the first adapter the platform reports. On macOS peripherals have no
//! stable address, so a configured address only works on Linux and Windows.

use std::time::Duration;

use btleplug::api::{
    Central, CharPropFlags, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, warn};

use crate::error::{BleError, BleResult};
use crate::radio::{
    BoxFuture, CharacteristicInfo, GattTarget, Link, PeripheralHandle, Radio, WriteMode,
};

/// Scan window used to find a configured address not yet known to the adapter.
const ADDRESS_LOOKUP_SCAN: Duration = Duration::from_secs(5);

fn backend(err: btleplug::Error) -> BleError {
    BleError::Backend(err.to_string())
}

/// A btleplug adapter.
pub struct BtleRadio {
    adapter: Adapter,
}

impl BtleRadio {
    /// Opens the first Bluetooth adapter.
    pub async fn first_adapter() -> BleResult<Self> {
        let manager = Manager::new().await.map_err(backend)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(backend)?
            .into_iter()
            .next()
            .ok_or(BleError::NoAdapter)?;
        if let Ok(info) = adapter.adapter_info().await {
            debug!(adapter = %info, "using bluetooth adapter");
        }
        Ok(Self { adapter })
    }

    async fn scan_for(&self, window: Duration) -> BleResult<Vec<Peripheral>> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(backend)?;

        // Stops the scan if the caller drops this future during the window.
        let adapter = self.adapter.clone();
        let guard = OnDrop::new(move || stop_cancelled_scan(adapter));
        tokio::time::sleep(window).await;
        guard.disarm();

        if let Err(err) = self.adapter.stop_scan().await {
            warn!(error = %err, "failed to stop scan");
        }
        self.adapter.peripherals().await.map_err(backend)
    }

    /// Finds a peripheral by address, scanning briefly if the adapter does
    /// not know it yet.
    async fn lookup(&self, address: &str) -> BleResult<Peripheral> {
        let matches = |p: &Peripheral| p.address().to_string().eq_ignore_ascii_case(address);

        let known = self.adapter.peripherals().await.map_err(backend)?;
        if let Some(peripheral) = known.into_iter().find(|p| matches(p)) {
            return Ok(peripheral);
        }

        debug!(address, "address unknown to adapter, scanning");
        self.scan_for(ADDRESS_LOOKUP_SCAN)
            .await?
            .into_iter()
            .find(|p| matches(p))
            .ok_or_else(|| BleError::Connection {
                address: address.to_string(),
                reason: "peripheral not found".to_string(),
            })
    }

    async fn handle(peripheral: &Peripheral) -> PeripheralHandle {
        let address = peripheral.address().to_string();
        match peripheral.properties().await {
            Ok(Some(properties)) => PeripheralHandle {
                address,
                name: properties.local_name,
                services: properties.services,
                rssi: properties.rssi,
            },
            Ok(None) => PeripheralHandle::from_address(address),
            Err(err) => {
                debug!(address, error = %err, "no properties");
                PeripheralHandle::from_address(address)
            }
        }
    }

    async fn open(
        &self,
        handle: &PeripheralHandle,
        target: &GattTarget,
    ) -> BleResult<Box<dyn Link>> {
        let connection_failed = |err: btleplug::Error| BleError::Connection {
            address: handle.address.clone(),
            reason: err.to_string(),
        };

        let peripheral = self.lookup(&handle.address).await?;
        peripheral.connect().await.map_err(connection_failed)?;

        let resolved = async {
            peripheral
                .discover_services()
                .await
                .map_err(connection_failed)?;

            let characteristics: Vec<_> = peripheral.characteristics().into_iter().collect();
            let candidates: Vec<CharacteristicInfo> = characteristics
                .iter()
                .map(|c| CharacteristicInfo {
                    uuid: c.uuid,
                    service: c.service_uuid,
                    writable: c.properties.intersects(
                        CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE,
                    ),
                })
                .collect();

            let selected = target
                .select(&candidates)
                .ok_or_else(|| BleError::CharacteristicNotFound {
                    address: handle.address.clone(),
                    service: target.service,
                    characteristic: target.characteristic,
                })?;
            characteristics
                .into_iter()
                .find(|c| c.uuid == selected.uuid && c.service_uuid == selected.service)
                .ok_or_else(|| BleError::CharacteristicNotFound {
                    address: handle.address.clone(),
                    service: target.service,
                    characteristic: target.characteristic,
                })
        }
        .await;

        match resolved {
            Ok(characteristic) => {
                info!(characteristic = %characteristic.uuid, "resolved write characteristic");
                Ok(Box::new(BtleLink {
                    peripheral,
                    characteristic,
                }))
            }
            Err(err) => {
                if let Err(disconnect_err) = peripheral.disconnect().await {
                    warn!(error = %disconnect_err, "disconnect after failed setup failed");
                }
                Err(err)
            }
        }
    }
}

impl Radio for BtleRadio {
    fn scan(&self, window: Duration) -> BoxFuture<'_, BleResult<Vec<PeripheralHandle>>> {
        Box::pin(async move {
            let peripherals = self.scan_for(window).await?;
            let mut handles = Vec::with_capacity(peripherals.len());
            for peripheral in &peripherals {
                handles.push(Self::handle(peripheral).await);
            }
            debug!(count = handles.len(), "scan finished");
            Ok(handles)
        })
    }

    fn connect<'a>(
        &'a self,
        peripheral: &'a PeripheralHandle,
        target: &'a GattTarget,
    ) -> BoxFuture<'a, BleResult<Box<dyn Link>>> {
        Box::pin(self.open(peripheral, target))
    }
}

/// Stops a scan whose future was dropped.
///
/// Blocks until the adapter acknowledged on a multi-thread runtime, so the
/// process cannot exit with the adapter still scanning.
fn stop_cancelled_scan(adapter: Adapter) {
    let Ok(runtime) = Handle::try_current() else {
        return;
    };
    let stop = async move {
        match adapter.stop_scan().await {
            Ok(()) => debug!("scan stopped after cancellation"),
            Err(err) => warn!(error = %err, "failed to stop cancelled scan"),
        }
    };
    match runtime.runtime_flavor() {
        RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| runtime.block_on(stop)),
        _ => {
            runtime.spawn(stop);
        }
    }
}

/// Runs a closure when dropped, unless disarmed first.
struct OnDrop<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> OnDrop<F> {
    fn new(action: F) -> Self {
        Self {
            action: Some(action),
        }
    }

    fn disarm(mut self) {
        self.action = None;
    }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

struct BtleLink {
    peripheral: Peripheral,
    characteristic: btleplug::api::Characteristic,
}

impl Link for BtleLink {
    fn write<'a>(&'a mut self, data: &'a [u8], mode: WriteMode) -> BoxFuture<'a, BleResult<()>> {
        let write_type = match mode {
            WriteMode::WithResponse => WriteType::WithResponse,
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
        };
        Box::pin(async move {
            self.peripheral
                .write(&self.characteristic, data, write_type)
                .await
                .map_err(backend)
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, BleResult<()>> {
        Box::pin(async move {
            self.peripheral.disconnect().await.map_err(backend)?;
            debug!("disconnected");
            Ok(())
        })
    }
}
