//! JSON-lines stream transport.

use crate::log_sink::LogSink;
use ers_config::ValidatedErsConfig;
use ers_domain::Severity;
use ers_ports::{AnyIssue, TransportPort};
use ers_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct JsonLine<'a> {
    stream: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u32>,
    issue: &'a AnyIssue,
}

/// Transport writing one JSON object per dispatch.
///
/// Each line holds the stream name, the debug level for the debug stream,
/// and the issue in its wire form including the cause chain.
#[derive(Clone)]
pub struct JsonStreamTransport {
    sink: Arc<dyn LogSink>,
    debug_level: u32,
}

impl JsonStreamTransport {
    /// Create a transport writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, debug_level: u32) -> Self {
        Self { sink, debug_level }
    }

    /// Create a transport using the configured debug level.
    #[must_use]
    pub fn from_config(config: &ValidatedErsConfig, sink: Arc<dyn LogSink>) -> Self {
        Self::new(sink, config.debug_level())
    }

    fn write(&self, stream: Severity, level: Option<u32>, issue: &AnyIssue) -> Result<()> {
        let line = JsonLine {
            stream: stream.stream_name(),
            level,
            issue,
        };
        let encoded = encode_line(&line)
            .map_err(|error| error.with_metadata("stream", stream.stream_name()))?;
        self.sink.write_line(&encoded);
        Ok(())
    }
}

/// One JSON object terminated by a newline.
fn encode_line<T: Serialize>(value: &T) -> Result<String> {
    let mut encoded = serde_json::to_string(value).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("transport", "serialize_failed"),
            format!("issue serialization failed: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    encoded.push('\n');
    Ok(encoded)
}

impl std::fmt::Debug for JsonStreamTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("JsonStreamTransport")
            .field("debug_level", &self.debug_level)
            .finish_non_exhaustive()
    }
}

impl TransportPort for JsonStreamTransport {
    fn debug(&self, issue: &AnyIssue, level: u32) -> Result<()> {
        self.write(Severity::Debug, Some(level), issue)
    }

    fn log(&self, issue: &AnyIssue) -> Result<()> {
        self.write(Severity::Log, None, issue)
    }

    fn info(&self, issue: &AnyIssue) -> Result<()> {
        self.write(Severity::Info, None, issue)
    }

    fn warning(&self, issue: &AnyIssue) -> Result<()> {
        self.write(Severity::Warning, None, issue)
    }

    fn error(&self, issue: &AnyIssue) -> Result<()> {
        self.write(Severity::Error, None, issue)
    }

    fn fatal(&self, issue: &AnyIssue) -> Result<()> {
        self.write(Severity::Fatal, None, issue)
    }

    fn debug_level(&self) -> u32 {
        self.debug_level
    }
}
