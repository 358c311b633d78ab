//! Interrupt handling.
//!
//! Ctrl+C (and SIGTERM on Unix) flips a `watch` flag that the transmitter
//! races against every write and delay, so the link is still disconnected
//! before the process exits with code 130.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Owner of the shutdown flag.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawns the listener task. Call once, from inside the runtime.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "failed to listen for Ctrl+C");
                        return;
                    }
                    info!("received Ctrl+C, stopping");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, stopping");
                }
            }
            let _ = shutdown_tx.send(true);
        });
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("received Ctrl+C, stopping");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    /// Returns a receiver for the shutdown flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Requests shutdown as if a signal had arrived.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());
        assert!(!*handler.subscribe().borrow());
    }

    #[tokio::test]
    async fn trigger_reaches_subscribers() {
        let handler = SignalHandler::new();
        let mut rx = handler.subscribe();

        handler.trigger_shutdown();

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
        assert!(handler.is_shutdown());
    }
}
