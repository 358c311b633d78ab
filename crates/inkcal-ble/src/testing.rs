//! In-memory radio for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{BleError, BleResult};
use crate::radio::{BoxFuture, GattTarget, Link, PeripheralHandle, Radio, WriteMode};

type WriteHook = Arc<dyn Fn(usize) + Send + Sync>;
type ConnectHook = Box<dyn Fn() + Send + Sync>;

/// Everything the fake link observed.
#[derive(Debug, Default)]
pub struct LinkLog {
    pub connected_to: Option<String>,
    pub writes: Vec<(Vec<u8>, WriteMode)>,
    pub disconnected: bool,
}

impl LinkLog {
    /// All written bytes, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.writes.iter().flat_map(|(data, _)| data.clone()).collect()
    }

    pub fn modes(&self) -> Vec<WriteMode> {
        self.writes.iter().map(|(_, mode)| *mode).collect()
    }
}

#[derive(Default)]
pub struct FakeRadio {
    peripherals: Vec<PeripheralHandle>,
    scans: AtomicUsize,
    refuse_connect: bool,
    connect_delay: Duration,
    on_connect: Option<ConnectHook>,
    fail_write_at: Option<usize>,
    on_write: Option<WriteHook>,
    log: Arc<Mutex<LinkLog>>,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peripherals(mut self, peripherals: Vec<PeripheralHandle>) -> Self {
        self.peripherals = peripherals;
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Takes `delay` to establish the connection.
    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Calls `hook` once the connection is established, before it is returned.
    pub fn on_connect(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Box::new(hook));
        self
    }

    /// Fails the write with the given zero-based index.
    pub fn failing_write(mut self, index: usize) -> Self {
        self.fail_write_at = Some(index);
        self
    }

    /// Calls `hook` with the index of every successful write.
    pub fn on_write(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_write = Some(Arc::new(hook));
        self
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, LinkLog> {
        self.log.lock().unwrap()
    }
}

impl Radio for FakeRadio {
    fn scan(&self, window: Duration) -> BoxFuture<'_, BleResult<Vec<PeripheralHandle>>> {
        Box::pin(async move {
            self.scans.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(window).await;
            Ok(self.peripherals.clone())
        })
    }

    fn connect<'a>(
        &'a self,
        peripheral: &'a PeripheralHandle,
        _target: &'a GattTarget,
    ) -> BoxFuture<'a, BleResult<Box<dyn Link>>> {
        Box::pin(async move {
            if self.refuse_connect {
                return Err(BleError::Connection {
                    address: peripheral.address.clone(),
                    reason: "peripheral not found".to_string(),
                });
            }
            self.log.lock().unwrap().connected_to = Some(peripheral.address.clone());
            if !self.connect_delay.is_zero() {
                tokio::time::sleep(self.connect_delay).await;
            }
            if let Some(hook) = &self.on_connect {
                hook();
            }
            let link: Box<dyn Link> = Box::new(FakeLink {
                log: self.log.clone(),
                fail_write_at: self.fail_write_at,
                on_write: self.on_write.clone(),
                writes: 0,
            });
            Ok(link)
        })
    }
}

struct FakeLink {
    log: Arc<Mutex<LinkLog>>,
    fail_write_at: Option<usize>,
    on_write: Option<WriteHook>,
    writes: usize,
}

impl Link for FakeLink {
    fn write<'a>(&'a mut self, data: &'a [u8], mode: WriteMode) -> BoxFuture<'a, BleResult<()>> {
        Box::pin(async move {
            let index = self.writes;
            self.writes += 1;
            if self.fail_write_at == Some(index) {
                return Err(BleError::Backend("GATT error 0x0e".to_string()));
            }
            self.log.lock().unwrap().writes.push((data.to_vec(), mode));
            if let Some(hook) = &self.on_write {
                hook(index);
            }
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, BleResult<()>> {
        Box::pin(async move {
            self.log.lock().unwrap().disconnected = true;
            Ok(())
        })
    }
}
