//! Service plumbing shared by the catalog and users binaries.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (record in span, echo in response)
//! 4. HTTP metrics (count + latency per matched route)
//! 5. CORS (only when origins are configured)
//! 6. Per-route auth / role gates

pub mod health;
pub mod layers;
pub mod metrics;
pub mod request_id;
pub mod telemetry;

use std::net::SocketAddr;

use axum::Router;

pub use health::{health, metrics_endpoint, readiness};
pub use layers::{cors_layer, with_service_layers};
pub use request_id::request_id_middleware;
pub use telemetry::{LogFormat, TelemetryConfig, init_telemetry};

/// Bind `addr` and serve `app` until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns the I/O error if binding or serving fails.
pub async fn serve(app: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
