//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (observability, request ID, timeout, tower tracing)
//! - Bind server to listener with peer address info
//! - Serve the metrics scrape endpoint, inline or on its own listener
//! - Graceful shutdown on broadcast signal

use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ServiceConfig, WelcomeConfig};
use crate::http::handlers;
use crate::http::middleware::observe_request;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::upstream::{UpstreamClient, UpstreamError};
use crate::observability::Telemetry;

/// Interval between Prometheus recorder upkeep runs.
const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Error type for server construction and serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub telemetry: Telemetry,
    pub upstream: UpstreamClient,
    pub welcome: WelcomeConfig,
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and telemetry handles.
    pub fn new(config: &ServiceConfig, telemetry: Telemetry) -> Result<Self, ServerError> {
        let state = AppState {
            telemetry,
            upstream: UpstreamClient::new(&config.upstream)?,
            welcome: config.welcome.clone(),
        };

        let router = Self::build_router(config, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout sits inside the observability layer so a timed-out
    /// handler is recorded with its 408 response. `/metrics` is added after
    /// the observability layer so scrapes are not logged.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", get(handlers::root))
            .route("/welcome", get(handlers::welcome))
            .route("/external", get(handlers::external))
            .fallback(handlers::root)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(
                state.telemetry.clone(),
                observe_request,
            ));

        if state.telemetry.metrics.is_enabled() {
            router = router.route("/metrics", get(handlers::metrics));
        }

        router
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Router serving only the scrape endpoint, for a standalone metrics listener.
    pub fn metrics_router(&self) -> Router {
        Router::new()
            .route("/metrics", get(handlers::metrics))
            .with_state(self.state.clone())
    }

    /// The fully layered application router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.state.upstream.url(),
            "HTTP server starting"
        );

        let upkeep = self.state.telemetry.metrics.handle().map(|handle| {
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
                loop {
                    ticker.tick().await;
                    handle.run_upkeep();
                }
            })
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        if let Some(upkeep) = upkeep {
            upkeep.abort();
        }
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Serve a router on its own listener until shutdown.
pub async fn serve_router(
    router: Router,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Metrics listener starting");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
