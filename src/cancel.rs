//! Cancellation source shared by the client and its waits.
//!
//! A [`Cancellation`] is a cloneable flag that flips once. Every clone observes
//! the same state, and any number of tasks can await [`Cancellation::cancelled`].
//! Timeouts are layered on top with `tokio::time::timeout` at the wait site.
//!
//! # Example
//!
//! ```
//! use natswire_client::Cancellation;
//!
//! # #[tokio::main] async fn main() {
//! let cancellation = Cancellation::new();
//! let waiter = cancellation.clone();
//!
//! let task = tokio::spawn(async move { waiter.cancelled().await });
//! cancellation.cancel();
//! task.await.unwrap();
//! assert!(cancellation.is_cancelled());
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable, one-shot cancellation source.
#[derive(Debug, Clone)]
pub struct Cancellation {
    state: Arc<watch::Sender<bool>>,
}

impl Cancellation {
    /// Create a source that is not cancelled yet.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Create a source that fires on Ctrl-C (and SIGTERM on Unix).
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_shutdown_signal() -> Self {
        let cancellation = Self::new();
        let trigger = cancellation.clone();

        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            trigger.cancel();
        });

        cancellation
    }

    /// Fire the cancellation. Idempotent.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Whether the source has fired.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the source fires (immediately if it already has).
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Could not install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
