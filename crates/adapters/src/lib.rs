//! # ers-adapters
//!
//! Adapter implementations for ports: output streams and their per-severity
//! chains, line sinks, and the `tracing` bridge. This crate depends on
//! `ports`, `config`, `domain` and `shared`.

pub mod filter_stream;
pub mod issue_catcher;
pub mod json_stream;
pub mod log_sink;
pub mod standard_stream;
pub mod stream_chain;
pub mod throttle_stream;
pub mod tracing_layer;

pub use filter_stream::{FilterTransport, QualifierFilter};
pub use issue_catcher::{CatcherGuard, CatchingTransport, IssueCatcher};
pub use json_stream::JsonStreamTransport;
pub use log_sink::{LogSink, StderrLogSink, StdoutLogSink};
pub use standard_stream::StandardStreamTransport;
pub use stream_chain::{SeverityStreamsTransport, StreamOutputs, build_stream_chain};
pub use throttle_stream::{ThrottleLimits, ThrottleTransport};
pub use tracing_layer::IssueLayer;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
