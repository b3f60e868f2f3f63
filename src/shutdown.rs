//! Provides a shutdown signal to gracefully stop a run.
//!
//! See: [`signal`], [`SHUTDOWN`]

#![cfg(feature = "shutdown")]

use crate::static_lazy_lock;

use tokio::{signal, sync::broadcast};
use tracing::{error, warn};

static_lazy_lock! {
    /// The broadcast sender to stop the run from inside the process.
    pub SHUTDOWN: broadcast::Sender<()> = {
        let (tx, _) = broadcast::channel::<()>(1);
        tx
    };
}

/// Resolves when the process should stop, either on Ctrl + C or on a message through [`SHUTDOWN`].
///
/// If the Ctrl + C handler cannot be installed, only [`SHUTDOWN`] is listened to.
pub async fn signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => warn!("received Ctrl + C, stopping…"),
            Err(err) => {
                error!("failed to install Ctrl + C signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    let mut shutdown = SHUTDOWN.subscribe();

    tokio::select! {
        _ = ctrl_c => {}
        result = shutdown.recv() => if result.is_ok() {
            warn!("shutdown requested, stopping…");
        }
    }
}
