//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every wrapped request produces:
//!     → logging.rs (started/completed access log events)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing.rs (one server span per handler)
//!
//! Consumers:
//!     → Log aggregation (stderr/stdout, one JSON object per line)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Span exporter (stdout or OTLP collector)
//! ```
//!
//! # Design Decisions
//! - All handles are created once by `bootstrap` and passed into the server
//! - Telemetry failures never fail a request
//! - Dropping `TelemetryGuard` flushes buffered spans

pub mod logging;
pub mod metrics;
pub mod tracing;

use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::config::ObservabilityConfig;

pub use self::logging::{init_logging, Level, LogEvent, RequestFields, StructuredLogger};
pub use self::metrics::{MetricsError, RequestMetrics};
pub use self::tracing::{RequestSpan, RequestTracer};

/// Error type for telemetry bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Process-wide telemetry handles shared by every request.
#[derive(Clone, Debug)]
pub struct Telemetry {
    pub logger: StructuredLogger,
    pub metrics: RequestMetrics,
    pub tracer: RequestTracer,
}

#[cfg(test)]
impl Telemetry {
    /// Access log only; no spans or metrics.
    pub fn logging_only(logger: StructuredLogger) -> Self {
        Self {
            logger,
            metrics: RequestMetrics::disabled(),
            tracer: RequestTracer::disabled(),
        }
    }
}

/// Shuts the tracer provider down when dropped.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flush and shut down now instead of at drop.
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                ::tracing::warn!(error = %e, "Failed to shut down tracer provider");
            }
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Build the telemetry handles described by the configuration.
///
/// The returned guard must be kept alive for as long as spans are produced.
pub fn bootstrap(config: &ObservabilityConfig) -> Result<(Telemetry, TelemetryGuard), TelemetryError> {
    let logger = StructuredLogger::for_target(config.access_log);

    let metrics = if config.metrics_enabled {
        RequestMetrics::prometheus()?
    } else {
        RequestMetrics::disabled()
    };

    let provider = self::tracing::build_provider(&config.tracing);
    let tracer = RequestTracer::new(&provider, config.tracing.service_name.clone());

    ::tracing::info!(
        exporter = ?config.tracing.exporter,
        metrics_enabled = config.metrics_enabled,
        "Telemetry initialized"
    );

    Ok((
        Telemetry {
            logger,
            metrics,
            tracer,
        },
        TelemetryGuard {
            tracer_provider: Some(provider),
        },
    ))
}
