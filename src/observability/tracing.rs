//! Distributed tracing support.
//!
//! # Responsibilities
//! - Build the span export pipeline (stdout, OTLP, or none)
//! - Create one server span per handler invocation
//! - Flush buffered spans on shutdown
//!
//! # Design Decisions
//! - The tracer is an explicit handle; no global tracer provider is set
//! - Exporter construction failures degrade to a provider without export

use std::borrow::Cow;

use axum::http::StatusCode;
use opentelemetry::trace::{Span as _, SpanKind, Status, Tracer as _, TracerProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider, Span};
use opentelemetry_sdk::Resource;

use crate::config::{TraceExporter, TracingConfig};
use crate::observability::logging::RequestFields;

/// Build the tracer provider described by the configuration.
pub fn build_provider(config: &TracingConfig) -> SdkTracerProvider {
    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .build();
    let builder = SdkTracerProvider::builder().with_resource(resource);

    match config.exporter {
        TraceExporter::Stdout => builder
            .with_batch_exporter(opentelemetry_stdout::SpanExporter::default())
            .build(),
        TraceExporter::Otlp => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(&config.otlp_endpoint)
                .build();
            match exporter {
                Ok(exporter) => {
                    tracing::info!(endpoint = %config.otlp_endpoint, "OTLP span exporter configured");
                    builder.with_batch_exporter(exporter).build()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create OTLP exporter, spans will not be exported");
                    builder.build()
                }
            }
        }
        TraceExporter::None => builder.build(),
    }
}

/// Handle used by the request pipeline to open spans.
#[derive(Clone, Debug, Default)]
pub struct RequestTracer {
    tracer: Option<SdkTracer>,
}

impl RequestTracer {
    /// Tracer obtained from a provider.
    pub fn new(provider: &SdkTracerProvider, scope: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tracer: Some(provider.tracer(scope)),
        }
    }

    /// Tracer that opens no spans.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Open a server span named after the handler.
    pub fn start(
        &self,
        handler: &'static str,
        fields: &RequestFields,
        request_id: Option<&str>,
    ) -> RequestSpan {
        let span = self.tracer.as_ref().map(|tracer| {
            let mut attributes = vec![
                KeyValue::new("http.request.method", fields.method.clone()),
                KeyValue::new("url.path", fields.path.clone()),
            ];
            if !fields.remote.is_empty() {
                attributes.push(KeyValue::new("client.address", fields.remote.clone()));
            }
            if let Some(id) = request_id {
                attributes.push(KeyValue::new("http.request.id", id.to_string()));
            }

            tracer
                .span_builder(handler)
                .with_kind(SpanKind::Server)
                .with_attributes(attributes)
                .start(tracer)
        });
        RequestSpan { span }
    }
}

/// An open span for one handler invocation.
pub struct RequestSpan {
    span: Option<Span>,
}

impl RequestSpan {
    /// Record the response status and end the span.
    ///
    /// Takes the raw code so non-standard statuses such as 499 can be recorded.
    pub fn finish(mut self, status: u16) {
        if let Some(mut span) = self.span.take() {
            span.set_attribute(KeyValue::new("http.response.status_code", i64::from(status)));
            if (500..600).contains(&status) {
                let description = StatusCode::from_u16(status)
                    .map(|code| code.to_string())
                    .unwrap_or_else(|_| status.to_string());
                span.set_status(Status::error(description));
            }
            span.end();
        }
    }
}
