//! OS signal handling for graceful shutdown

use doorlink_core::prelude::*;

/// Resolve when the process is asked to stop.
///
/// If the signal handlers cannot be installed the error is logged and this
/// never resolves; the device keeps running.
pub async fn shutdown_signal() {
    if let Err(e) = wait_for_signal().await {
        error!("Signal handler error: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => debug!("Received SIGINT"),
            _ = sigterm.recv() => debug!("Received SIGTERM"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        debug!("Received Ctrl+C");
        Ok(())
    }
}
