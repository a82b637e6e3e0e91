//! HTTP middleware.

pub mod observe;

pub use observe::{observe_request, CLIENT_CLOSED_REQUEST, FAVICON_PATH};
