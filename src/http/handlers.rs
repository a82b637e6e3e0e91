//! Request handlers.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::TryStreamExt;

use crate::host;
use crate::http::server::AppState;
use crate::observability::RequestFields;

/// Body of the root endpoint.
pub const GREETING: &str = "Hello World!";

/// Body returned when the upstream cannot be reached.
pub const UPSTREAM_FAILURE: &str = "Failed to reach upstream";

/// Content type of the Prometheus text exposition.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /` and every unmatched path.
pub async fn root() -> &'static str {
    GREETING
}

/// `GET /welcome`: host, user and current time.
pub async fn welcome(State(state): State<AppState>) -> String {
    let now = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    format!(
        "\n{}\nHost: {}\nUsername: {}\nDate & Time: {}\n",
        state.welcome.greeting,
        host::hostname(),
        host::current_username(),
        now
    )
}

/// `GET /external`: stream the upstream response back to the client.
///
/// Only the content type and body are forwarded.
pub async fn external(State(state): State<AppState>, fields: RequestFields) -> Response {
    let upstream = match state.upstream.fetch().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(upstream = %state.upstream.url(), error = %e, "Upstream request failed");
            return (StatusCode::BAD_GATEWAY, UPSTREAM_FAILURE).into_response();
        }
    };

    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let logger = state.telemetry.logger.clone();
    let body = upstream
        .bytes_stream()
        .inspect_err(move |e| logger.error("Error forwarding response", &fields, e));

    let mut response = Response::new(Body::from_stream(body));
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

/// `GET /metrics`: Prometheus scrape.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.telemetry.metrics.render() {
        Some(body) => ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics disabled").into_response(),
    }
}
