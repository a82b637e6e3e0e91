//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize telemetry handles
//! - Build the HTTP server and bind its listeners
//! - Run until a termination signal, then release telemetry
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::server::{serve_router, HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::{self, TelemetryError};

/// Error type for service startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("telemetry setup failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("server setup failed: {0}")]
    Server(#[from] ServerError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Run the service with the given configuration until shutdown.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    // Dropping the guard on any early return still flushes spans.
    let (telemetry, guard) = observability::bootstrap(&config.observability)?;
    let server = HttpServer::new(&config, telemetry)?;

    let listener = bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr().map_err(ServerError::from)?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();

    let metrics_task = match &config.observability.metrics_address {
        Some(address) if config.observability.metrics_enabled => {
            let metrics_listener = bind(address).await?;
            Some(tokio::spawn(serve_router(
                server.metrics_router(),
                metrics_listener,
                shutdown.subscribe(),
            )))
        }
        _ => None,
    };

    signals::spawn_signal_listener(shutdown.clone());
    let result = server.run(listener, shutdown.subscribe()).await;

    // Stop the metrics listener as well when the main server exits on error.
    shutdown.trigger();
    if let Some(task) = metrics_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Metrics listener failed"),
            Err(e) => tracing::error!(error = %e, "Metrics listener task panicked"),
            Ok(Ok(())) => {}
        }
    }

    guard.shutdown();
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
