//! Meetup demo HTTP service library.

pub mod config;
pub mod host;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::{Telemetry, TelemetryGuard};
