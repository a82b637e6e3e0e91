//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the diagnostic logging subsystem (`tracing`)
//! - Emit the per-request access log as one JSON object per line
//!
//! # Design Decisions
//! - Diagnostic logs use the tracing crate; JSON or pretty format from config
//! - Access log lines are written whole under a lock so concurrent requests
//!   never interleave within a line
//! - Access logging is best effort: encode and write errors are dropped

use std::convert::Infallible;
use std::fmt;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, Extensions, Method, Uri};
use chrono::{Local, SecondsFormat};
use serde::Serialize;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::{AccessLogTarget, LogFormat, ObservabilityConfig};

/// Initialize the diagnostic log subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "meetup_server={},tower_http=warn",
            config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .try_init(),
    }
}

/// Severity of an access log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Error,
}

/// One structured record describing a single lifecycle point of a request.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remote: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEvent {
    /// Build an event stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>, fields: &RequestFields) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            level,
            message: message.into(),
            method: fields.method.clone(),
            path: fields.path.clone(),
            remote: fields.remote.clone(),
            duration: String::new(),
            error: None,
        }
    }

    /// Attach the elapsed time of a completed request.
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration = format_duration(elapsed);
        self
    }

    /// Attach the description of an error.
    pub fn with_error(mut self, error: &dyn fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Append extra detail to the message as `"<message> - <detail>"`.
    pub fn with_detail(mut self, detail: &str) -> Self {
        if !detail.is_empty() {
            self.message = format!("{} - {}", self.message, detail);
        }
        self
    }
}

/// Render a duration the way it appears in the access log, e.g. `1.234ms`.
pub fn format_duration(elapsed: Duration) -> String {
    format!("{:?}", elapsed)
}

/// Method, path and peer address of a request, as logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFields {
    pub method: String,
    pub path: String,
    pub remote: String,
}

impl RequestFields {
    /// Collect the fields from request parts.
    ///
    /// `remote` is empty when the server was not started with connect info.
    pub fn new(method: &Method, uri: &Uri, extensions: &Extensions) -> Self {
        let remote = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_default();
        Self {
            method: method.to_string(),
            path: uri.path().to_string(),
            remote,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestFields {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::new(&parts.method, &parts.uri, &parts.extensions))
    }
}

type Sink = Box<dyn Write + Send>;

/// Line-oriented JSON access logger.
///
/// Clones share the same sink.
#[derive(Clone)]
pub struct StructuredLogger {
    sink: Arc<Mutex<Sink>>,
}

impl StructuredLogger {
    /// Logger writing to any sink.
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Logger writing to the configured standard stream.
    pub fn for_target(target: AccessLogTarget) -> Self {
        match target {
            AccessLogTarget::Stderr => Self::with_writer(io::stderr()),
            AccessLogTarget::Stdout => Self::with_writer(io::stdout()),
        }
    }

    /// Logger that discards every event.
    pub fn discard() -> Self {
        Self::with_writer(io::sink())
    }

    /// Encode one event and write it as a single line.
    pub fn emit(&self, event: &LogEvent) {
        let Ok(mut line) = serde_json::to_vec(event) else {
            return;
        };
        line.push(b'\n');

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = sink.write_all(&line);
        let _ = sink.flush();
    }

    /// Emit the "Started request" event.
    pub fn started(&self, fields: &RequestFields) {
        self.emit(&LogEvent::new(Level::Info, "Started request", fields));
    }

    /// Emit the "Completed request" event with the elapsed time.
    pub fn completed(&self, fields: &RequestFields, elapsed: Duration) {
        self.emit(&LogEvent::new(Level::Info, "Completed request", fields).with_duration(elapsed));
    }

    /// Emit the "Completed request" event for a request abandoned before its
    /// response was fully sent.
    pub fn cancelled(&self, fields: &RequestFields, elapsed: Duration) {
        self.emit(
            &LogEvent::new(Level::Info, "Completed request", fields)
                .with_duration(elapsed)
                .with_detail("client closed request"),
        );
    }

    /// Emit an error-level event.
    pub fn error(&self, message: &str, fields: &RequestFields, error: &dyn fmt::Display) {
        self.emit(&LogEvent::new(Level::Error, message, fields).with_error(error));
    }
}

impl fmt::Debug for StructuredLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredLogger").finish_non_exhaustive()
    }
}
