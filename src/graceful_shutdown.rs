use derive_more::Display;
use tokio::signal;
use tracing::{error, warn};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    #[display("Ctrl+C")]
    Interrupt,
    #[display("SIGTERM")]
    Terminate,
}

/// Resolves with whichever stop signal arrives first. A signal that cannot be
/// listened for is logged and never fires.
pub async fn shutdown_signal() -> ShutdownSignal {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = ctrl_c => ShutdownSignal::Interrupt,
        _ = terminate => ShutdownSignal::Terminate,
    };

    warn!("🛑 {} received, initiating shutdown...", received);
    received
}
