//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Telemetry → Build server → Bind listeners → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Flush spans → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: telemetry first, then server, listeners last
//! - Fail fast: any startup error is fatal
//! - Telemetry guard outlives the servers so in-flight spans are flushed

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
