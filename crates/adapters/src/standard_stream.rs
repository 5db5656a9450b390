//! Human-readable stream transport.
//!
//! Each dispatch becomes one rendered entry, prefixed with the stream it was
//! sent to, e.g. `warning: 2026-Oct-19 10:00:00 [open() at io.rs:12] ...`.

use crate::log_sink::{LogSink, terminated};
use ers_config::ValidatedErsConfig;
use ers_domain::{Severity, render};
use ers_ports::{AnyIssue, TransportPort};
use ers_shared::Result;
use std::sync::Arc;

/// Transport rendering issues at a fixed verbosity into a [`LogSink`].
#[derive(Clone)]
pub struct StandardStreamTransport {
    sink: Arc<dyn LogSink>,
    verbosity: i32,
    debug_level: u32,
}

impl StandardStreamTransport {
    /// Create a transport writing to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, verbosity: i32, debug_level: u32) -> Self {
        Self {
            sink,
            verbosity,
            debug_level,
        }
    }

    /// Create a transport using the configured verbosity and debug level.
    #[must_use]
    pub fn from_config(config: &ValidatedErsConfig, sink: Arc<dyn LogSink>) -> Self {
        Self::new(sink, config.verbosity_level(), config.debug_level())
    }

    /// Rendering verbosity.
    #[must_use]
    pub const fn verbosity(&self) -> i32 {
        self.verbosity
    }

    fn write(&self, stream: Severity, level: Option<u32>, issue: &AnyIssue) -> Result<()> {
        let prefix = match level {
            Some(level) => format!("{}[{level}]", stream.stream_name()),
            None => stream.stream_name().to_owned(),
        };
        let line = format!("{prefix}: {}", render(issue, self.verbosity));
        self.sink.write_line(&terminated(line));
        Ok(())
    }
}

impl std::fmt::Debug for StandardStreamTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StandardStreamTransport")
            .field("verbosity", &self.verbosity)
            .field("debug_level", &self.debug_level)
            .finish_non_exhaustive()
    }
}

impl TransportPort for StandardStreamTransport {
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
