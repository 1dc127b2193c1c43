use std::future::Future;

use async_shutdown::{ShutdownManager, ShutdownSignal};
use tokio::signal;
use tracing::info;

/// Cancellation handle for a decommission run. Cordon and evictions already issued are
/// never undone; cancellation skips the evictions not yet sent and stops the wait for
/// the node to empty. A shutdown command already sent to the host is left to finish.
#[derive(Clone)]
pub struct Shutdown {
    shutdown: ShutdownManager<()>,
}

impl Shutdown {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Shutdown {
        Self::new_with_signal(shutdown_signal())
    }

    pub fn new_with_signal<F>(signal: F) -> Shutdown
    where
        F: Future + Send + 'static,
    {
        let shutdown = ShutdownManager::new();

        tokio::spawn({
            let shutdown = shutdown.clone();

            async move {
                signal.await;

                info!("Shutdown requested");
                _ = shutdown.trigger_shutdown(());
            }
        });

        Shutdown { shutdown }
    }

    pub fn trigger_shutdown(&self) {
        _ = self.shutdown.trigger_shutdown(());
    }

    pub fn is_shutdown_triggered(&self) -> bool {
        self.shutdown.is_shutdown_triggered()
    }

    pub fn wait_shutdown_triggered(&self) -> ShutdownSignal<()> {
        self.shutdown.wait_shutdown_triggered()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler")
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    {
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        };
    }
}
