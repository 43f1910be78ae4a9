use super::ShutdownReason;
use tracing::{info, warn};

/// Resolve on SIGINT (Ctrl+C) or, on Unix, SIGTERM
pub async fn wait_for_shutdown_signal() -> ShutdownReason {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM signal");
                        return ShutdownReason::Signal("SIGTERM".to_string());
                    }
                    reason = ctrl_c() => return reason,
                }
            }
            Err(e) => warn!("Failed to register SIGTERM handler: {}", e),
        }
    }

    ctrl_c().await
}

async fn ctrl_c() -> ShutdownReason {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received SIGINT signal (Ctrl+C)");
            ShutdownReason::Signal("SIGINT".to_string())
        }
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            // Without a signal source only cancellation can stop the runtime
            std::future::pending().await
        }
    }
}
