//! Observability plumbing for the shopfront service.
//!
//! This crate provides:
//! - `init_logging` - Global `tracing` subscriber setup (JSON or human output)
//! - `LoggingConfig` - The `[logging]` configuration section
//! - `RequestId` - Per-request correlation identifier

mod logging;
mod request_id;

pub use logging::*;
pub use request_id::*;
