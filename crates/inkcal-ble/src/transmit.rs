//! Chunked transfer to the display.
//!
//! One transfer walks this state machine:
//!
//! ```text
//! Idle ─► Connecting ─► Connected ─┬──────────────┬─► CombinedWrite ────────────┬─► Done
//!                                  └─► TimeSent ──┤                              │
//!                                                 └─► HeaderSent ─► ChunkLoop ───┘
//! ```
//!
//! Any error moves to `Failed`. The link is disconnected whenever the
//! transfer leaves `Connected` or a later state, successful or not.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use inkcal_protocol::{Frame, time_header};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::error::{BleError, BleResult};
use crate::policy::{TransferMode, TransferPolicy, TransferSettings, resolve_policy};
use crate::radio::{GattTarget, Link, PeripheralHandle, Radio, WriteMode};

/// What to send.
#[derive(Debug, Clone, Copy)]
pub enum Transfer<'a> {
    /// The framed payload, optionally preceded by a `TIME:` line.
    Frame { frame: &'a Frame, time: Option<i64> },
    /// Only the `TIME:` line.
    TimeOnly(i64),
}

impl Transfer<'_> {
    fn time(&self) -> Option<i64> {
        match self {
            Self::Frame { time, .. } => *time,
            Self::TimeOnly(epoch) => Some(*epoch),
        }
    }
}

/// States of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Connecting,
    Connected,
    TimeSent,
    CombinedWrite,
    HeaderSent,
    ChunkLoop,
    Done,
    Failed,
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Body progress after each write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Body bytes written so far.
    pub sent: usize,
    /// Total body bytes.
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.sent * 100) / self.total).min(100) as u8
    }
}

/// Outcome of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    /// `None` for a time-only transfer.
    pub mode: Option<TransferMode>,
    /// States visited, `Idle` through `Done`.
    pub states: Vec<TransferState>,
    /// Number of writes issued.
    pub writes: usize,
    /// Bytes written, headers included.
    pub bytes: usize,
}

type ProgressFn = Arc<dyn Fn(Progress) + Send + Sync>;

/// Sends frames to the display over a [`Radio`].
pub struct Transmitter {
    settings: TransferSettings,
    shutdown: Option<watch::Receiver<bool>>,
    progress: Option<ProgressFn>,
}

impl Transmitter {
    pub fn new(settings: TransferSettings) -> Self {
        Self {
            settings,
            shutdown: None,
            progress: None,
        }
    }

    /// Cancels the transfer once `shutdown` turns true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Calls `progress` after every body write.
    pub fn with_progress(mut self, progress: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Connects to `peripheral` and performs `transfer`.
    ///
    /// The link is always disconnected before returning once connected.
    pub async fn send(
        &self,
        radio: &dyn Radio,
        peripheral: &PeripheralHandle,
        target: &GattTarget,
        transfer: Transfer<'_>,
    ) -> BleResult<TransferReport> {
        let policy = match transfer {
            Transfer::Frame { frame, .. } => {
                Some(resolve_policy(frame.total_len(), frame.body_len(), &self.settings))
            }
            Transfer::TimeOnly(_) => None,
        };
        if let Some(policy) = &policy {
            debug!(?policy, "resolved transfer policy");
        }

        let mut run = Run::new(policy.map(|p| p.mode));
        run.enter(TransferState::Connecting);

        if self.shutdown_signalled() {
            run.enter(TransferState::Failed);
            return Err(BleError::Interrupted);
        }

        // Not raced against shutdown; a link the backend opened is always
        // disconnected below.
        let mut link = match radio.connect(peripheral, target).await {
            Ok(link) => link,
            Err(err) => {
                run.enter(TransferState::Failed);
                return Err(err);
            }
        };
        run.enter(TransferState::Connected);
        info!(peripheral = %peripheral, "connected");

        let result = if self.shutdown_signalled() {
            info!("transfer interrupted");
            Err(BleError::Interrupted)
        } else {
            self.drive(link.as_mut(), transfer, policy, &mut run).await
        };

        let disconnected = link.disconnect().await;
        match (result, disconnected) {
            (Ok(()), disconnected) => {
                if let Err(err) = disconnected {
                    warn!(error = %err, "disconnect after transfer failed");
                }
                run.enter(TransferState::Done);
                info!(writes = run.report.writes, bytes = run.report.bytes, "transfer complete");
                Ok(run.report)
            }
            (Err(err), disconnected) => {
                if let Err(disconnect_err) = disconnected {
                    warn!(error = %disconnect_err, "disconnect after failed transfer failed");
                }
                run.enter(TransferState::Failed);
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        link: &mut dyn Link,
        transfer: Transfer<'_>,
        policy: Option<TransferPolicy>,
        run: &mut Run,
    ) -> BleResult<()> {
        if let Some(epoch) = transfer.time() {
            self.write(link, &time_header(epoch), WriteMode::WithResponse, run)
                .await?;
            run.enter(TransferState::TimeSent);
            debug!(epoch, "sent time");
        }

        let (Transfer::Frame { frame, .. }, Some(policy)) = (transfer, policy) else {
            return Ok(());
        };
        let total = frame.body_len();

        match policy.mode {
            TransferMode::Combined => {
                run.enter(TransferState::CombinedWrite);
                self.write(link, &frame.to_bytes(), WriteMode::WithResponse, run)
                    .await?;
                self.report(Progress { sent: total, total });
            }
            TransferMode::Split => {
                self.write(link, frame.header(), WriteMode::WithResponse, run)
                    .await?;
                run.enter(TransferState::HeaderSent);
                run.enter(TransferState::ChunkLoop);

                let chunks = policy.chunk_count(total);
                let mut sent = 0;
                for (index, chunk) in frame.body().chunks(policy.chunk_size).enumerate() {
                    let mode = policy.chunk_write_mode(chunk.len());
                    trace!(chunk = index + 1, chunks, len = chunk.len(), ?mode, "writing chunk");
                    self.write(link, chunk, mode, run).await?;
                    sent += chunk.len();
                    self.report(Progress { sent, total });

                    if index + 1 < chunks && !policy.chunk_delay.is_zero() {
                        self.interruptible(tokio::time::sleep(policy.chunk_delay))
                            .await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn write(
        &self,
        link: &mut dyn Link,
        data: &[u8],
        mode: WriteMode,
        run: &mut Run,
    ) -> BleResult<()> {
        let index = run.report.writes;
        self.interruptible(link.write(data, mode))
            .await?
            .map_err(|err| BleError::Write {
                index,
                len: data.len(),
                reason: err.to_string(),
            })?;
        run.report.writes += 1;
        run.report.bytes += data.len();
        Ok(())
    }

    fn report(&self, progress: Progress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }

    fn shutdown_signalled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|shutdown| *shutdown.borrow())
    }

    /// Runs `future` unless shutdown is signalled first.
    async fn interruptible<F: Future>(&self, future: F) -> BleResult<F::Output> {
        let Some(shutdown) = self.shutdown.clone() else {
            return Ok(future.await);
        };
        if *shutdown.borrow() {
            return Err(BleError::Interrupted);
        }

        tokio::select! {
            output = future => Ok(output),
            _ = shutdown_requested(shutdown) => {
                info!("transfer interrupted");
                Err(BleError::Interrupted)
            }
        }
    }
}

/// Completes once the flag turns true. Never completes if the sender is gone.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Bookkeeping for one transfer.
struct Run {
    state: TransferState,
    report: TransferReport,
}

impl Run {
    fn new(mode: Option<TransferMode>) -> Self {
        Self {
            state: TransferState::Idle,
            report: TransferReport {
                mode,
                states: vec![TransferState::Idle],
                writes: 0,
                bytes: 0,
            },
        }
    }

    fn enter(&mut self, next: TransferState) {
        trace!(from = %self.state, to = %next, "transfer state");
        self.state = next;
        self.report.states.push(next);
    }
}
