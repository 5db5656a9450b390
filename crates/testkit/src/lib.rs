//! # ers-testkit
//!
//! Test doubles and fixtures for the error reporting service.
//! This crate depends on `ports`, `adapters`, `domain` and `shared`.

pub mod doubles;
pub mod errors;
pub mod fixtures;

pub use doubles::{FailingTransport, MemorySink, RecordingHandler, RecordingTransport, Sent};

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
