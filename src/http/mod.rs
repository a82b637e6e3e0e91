//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info)
//!     → request.rs (assign request ID)
//!     → middleware/observe.rs (access log, span, metrics)
//!     → handlers.rs (root, welcome, external)
//!         → upstream.rs (outbound call for /external)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;
pub mod upstream;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
pub use upstream::UpstreamClient;
