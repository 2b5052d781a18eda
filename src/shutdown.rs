//! # Shutdown Signal
//!
//! A single "stop requested" flag shared by the signal listener and the
//! controller loop. SIGINT and SIGTERM are handled identically.

use tokio::sync::watch;
use tracing::{info, warn};

/// Receiving side of the stop request
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Sending side, held by whoever may request a stop
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // Receivers may already be gone during teardown
        let _ = self.tx.send(true);
    }
}

impl Shutdown {
    /// A linked trigger/receiver pair
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// Receiver wired to SIGINT (Ctrl+C) and, on unix, SIGTERM
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen() -> Shutdown {
        let (trigger, shutdown) = Self::channel();
        tokio::spawn(async move {
            wait_for_signal().await;
            trigger.trigger();
        });
        shutdown
    }

    /// Whether a stop has been requested
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once a stop is requested
    ///
    /// Never resolves if every trigger was dropped without firing.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
