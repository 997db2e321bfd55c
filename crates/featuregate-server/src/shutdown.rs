//! Graceful shutdown
//!
//! Signal handling for the gateway: resolves when SIGTERM (Docker and
//! Kubernetes) or Ctrl+C arrives, so `axum::serve` can drain in-flight
//! requests before exiting.

use tracing::info;

/// Wait for a shutdown signal (SIGTERM or Ctrl+C)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
