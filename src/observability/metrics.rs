//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define request metrics (count, latency, in-flight)
//! - Render the Prometheus text exposition for scraping
//!
//! # Metrics
//! - `http_server_requests_total` (counter): requests by handler, method, status
//! - `http_server_request_duration_seconds` (histogram): latency by handler, method
//! - `http_server_requests_in_flight` (gauge): requests currently executing
//!
//! # Design Decisions
//! - The recorder is an explicit handle, never installed as the global recorder
//! - Disabled metrics are a no-op handle rather than an `Option` at call sites
//! - Histogram buckets tuned for typical web latencies

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

const REQUESTS_TOTAL: &str = "http_server_requests_total";
const REQUEST_DURATION: &str = "http_server_request_duration_seconds";
const REQUESTS_IN_FLIGHT: &str = "http_server_requests_in_flight";

/// Latency buckets from 1ms to 10s.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Error type for metrics setup.
#[derive(Debug, thiserror::Error)]
#[error("metrics configuration error: {0}")]
pub struct MetricsError(String);

/// Handle used by the request pipeline to record metrics.
#[derive(Clone, Default)]
pub struct RequestMetrics {
    inner: Option<Arc<PrometheusRecorder>>,
}

impl RequestMetrics {
    /// Build a Prometheus recorder with the request metrics described.
    pub fn prometheus() -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets(LATENCY_BUCKETS)
            .map_err(|e| MetricsError(e.to_string()))?
            .build_recorder();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(REQUESTS_TOTAL, "Total HTTP requests handled");
            describe_histogram!(
                REQUEST_DURATION,
                metrics::Unit::Seconds,
                "Time spent in the handler"
            );
            describe_gauge!(REQUESTS_IN_FLIGHT, "HTTP requests currently executing");
        });

        Ok(Self {
            inner: Some(Arc::new(recorder)),
        })
    }

    /// Handle that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Mark a request as started. The returned guard marks it finished on drop.
    pub fn track_in_flight(&self, handler: &'static str) -> InFlightGuard {
        self.with_recorder(|| gauge!(REQUESTS_IN_FLIGHT, "handler" => handler).increment(1.0));
        InFlightGuard {
            metrics: self.clone(),
            handler,
        }
    }

    /// Record one finished request.
    pub fn record_request(&self, handler: &'static str, method: &str, status: u16, elapsed: Duration) {
        self.with_recorder(|| {
            counter!(
                REQUESTS_TOTAL,
                "handler" => handler,
                "method" => method.to_string(),
                "status" => status.to_string()
            )
            .increment(1);

            histogram!(
                REQUEST_DURATION,
                "handler" => handler,
                "method" => method.to_string()
            )
            .record(elapsed.as_secs_f64());
        });
    }

    /// Render the text exposition, or `None` when metrics are disabled.
    pub fn render(&self) -> Option<String> {
        self.handle().map(|handle| handle.render())
    }

    /// Scrape handle of the underlying recorder.
    pub fn handle(&self) -> Option<PrometheusHandle> {
        self.inner.as_ref().map(|recorder| recorder.handle())
    }

    fn with_recorder(&self, f: impl FnOnce()) {
        if let Some(recorder) = &self.inner {
            metrics::with_local_recorder(recorder.as_ref(), f);
        }
    }
}

impl std::fmt::Debug for RequestMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestMetrics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Decrements the in-flight gauge when dropped.
pub struct InFlightGuard {
    metrics: RequestMetrics,
    handler: &'static str,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let handler = self.handler;
        self.metrics
            .with_recorder(|| gauge!(REQUESTS_IN_FLIGHT, "handler" => handler).decrement(1.0));
    }
}
