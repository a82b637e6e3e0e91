//! Request observability middleware.
//! Wraps handlers with access logging, a server span and request metrics.
//!
//! A request is complete once its response body has been fully sent, has
//! failed, or has been dropped. Requests abandoned before a response exists
//! are recorded with status 499.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use tracing::Instrument;

use crate::http::request::request_id;
use crate::observability::metrics::InFlightGuard;
use crate::observability::{RequestFields, RequestSpan, Telemetry};

/// Browser auto-request that is passed through without instrumentation.
pub const FAVICON_PATH: &str = "/favicon.ico";

/// Status recorded when the client goes away before a response is produced.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Name used for spans and metric labels, derived from the matched route.
///
/// Unmatched paths are served by the root handler.
pub fn handler_name(matched: Option<&str>) -> &'static str {
    match matched {
        Some("/welcome") => "welcome",
        Some("/external") => "external",
        _ => "root",
    }
}

pub async fn observe_request(
    State(telemetry): State<Telemetry>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == FAVICON_PATH {
        return next.run(request).await;
    }

    let start = Instant::now();
    let handler = handler_name(request.extensions().get::<MatchedPath>().map(MatchedPath::as_str));
    let fields = RequestFields::new(request.method(), request.uri(), request.extensions());

    telemetry.logger.started(&fields);
    let span = telemetry
        .tracer
        .start(handler, &fields, request_id(request.headers()));
    let in_flight = telemetry.metrics.track_in_flight(handler);

    // Dropping this future before the handler returns completes the request as 499.
    let mut completion = Completion {
        telemetry,
        fields,
        handler,
        start,
        status: None,
        span: Some(span),
        in_flight: Some(in_flight),
    };

    let response = next
        .run(request)
        .instrument(tracing::info_span!("handler", name = handler))
        .await;

    completion.status = Some(response.status().as_u16());
    let (parts, body) = response.into_parts();
    Response::from_parts(
        parts,
        Body::new(ObservedBody {
            inner: body,
            completion: Some(completion),
        }),
    )
}

/// Finishes the span, metrics and access log of one request when dropped.
struct Completion {
    telemetry: Telemetry,
    fields: RequestFields,
    handler: &'static str,
    start: Instant,
    /// Response status, once the handler has produced one.
    status: Option<u16>,
    span: Option<RequestSpan>,
    in_flight: Option<InFlightGuard>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        drop(self.in_flight.take());

        let status = self.status.unwrap_or(CLIENT_CLOSED_REQUEST);
        if let Some(span) = self.span.take() {
            span.finish(status);
        }
        self.telemetry
            .metrics
            .record_request(self.handler, &self.fields.method, status, elapsed);

        if self.status.is_some() {
            self.telemetry.logger.completed(&self.fields, elapsed);
        } else {
            self.telemetry.logger.cancelled(&self.fields, elapsed);
        }
    }
}

/// Response body that completes its request at end of stream, on a body
/// error, or when dropped unfinished.
struct ObservedBody {
    inner: Body,
    completion: Option<Completion>,
}

impl HttpBody for ObservedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        let finished = match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => true,
            Poll::Ready(Some(Ok(_))) => self.inner.is_end_stream(),
            Poll::Pending => false,
        };
        if finished {
            drop(self.completion.take());
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
