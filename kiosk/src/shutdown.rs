//! Graceful shutdown for the kiosk.
//!
//! Listens for SIGINT/SIGTERM, broadcasts a shutdown signal to every
//! subscriber and cancels any verification session in progress.

use tokio::signal;
use tokio::sync::broadcast;

use votekiosk_verification::CancelToken;

/// Coordinates shutdown across the kiosk loop and its session worker.
///
/// Async tasks call [`subscribe`](Self::subscribe) and `select!` on the
/// receiver. Blocking session workers poll the [`CancelToken`] from
/// [`cancel_token`](Self::cancel_token) instead.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    cancel: CancelToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            cancel: CancelToken::new(),
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// A token that is cancelled when shutdown is triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
