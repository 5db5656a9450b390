//! # ers-ports
//!
//! Boundary contracts of the error reporting service.
//!
//! This crate defines the interfaces between the issue model and the
//! collaborators around it. It depends only on `domain` and `shared`.
//!
//! - **Transport** - `TransportPort`, the wire issue `AnyIssue` and its
//!   contexts, and the dispatch payload `Report`
//! - **Logger** - `LogLevel`, `LogRecord`, `LogHandler`

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod logger;
pub mod transport;

pub use logger::*;
pub use transport::*;

// Re-export domain types used in port signatures, so adapter crates can
// implement ports without directly depending on `ers-domain`.
pub use ers_domain::{CallSite, Issue, Parameters, ProcessContext, Reportable, Severity};
