//! Stopping the listener on SIGINT or SIGTERM.
//!
//! A health check in flight still holds its own database connection, so the
//! listener drains for a bounded period before the process exits and every
//! scoped connection gets its close.

use std::time::Duration;

use axum_server::Handle;

/// Upper bound on draining in-flight health checks
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Resolves with the name of the first stop signal received.
///
/// A signal that cannot be installed is logged and never fires.
async fn stop_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Spawn a task that drains `handle` once a stop signal arrives.
pub fn setup_shutdown_handler(handle: Handle) {
    tokio::spawn(async move {
        let signal = stop_signal().await;

        tracing::info!(
            signal,
            grace_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
            "Stopping dbpulse; no new health checks accepted"
        );
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
    });
}
