//! Severity routing onto a transport.
//!
//! The router validates that each payload carries the issue capability,
//! stamps the stream severity, converts it into the wire form and calls the
//! matching transport primitive. It performs no delivery, buffering or retry.

use ers_domain::{INTERNAL_LOG_TARGET, Severity};
use ers_ports::{AnyIssue, Report, TransportPort};
use ers_shared::{ErrorCode, ErrorEnvelope};
use std::sync::Arc;
use thiserror::Error;

/// Failure of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The payload is not an issue.
    #[error("{stream} stream expects an issue, got {payload}")]
    Precondition {
        /// Stream the payload was sent to.
        stream: &'static str,
        /// Payload variant that was rejected.
        payload: &'static str,
    },
    /// The transport failed; the envelope is the transport's own.
    #[error(transparent)]
    Transport(#[from] ErrorEnvelope),
}

impl DispatchError {
    /// Whether this is a precondition violation.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}

impl From<DispatchError> for ErrorEnvelope {
    fn from(error: DispatchError) -> Self {
        let message = error.to_string();
        match error {
            DispatchError::Precondition { stream, payload } => {
                Self::expected(ErrorCode::precondition_failed(), message)
                    .with_metadata("stream", stream)
                    .with_metadata("payload", payload)
            },
            DispatchError::Transport(envelope) => envelope,
        }
    }
}

/// One entry point per severity, forwarding to a [`TransportPort`].
#[derive(Clone)]
pub struct StreamRouter {
    transport: Arc<dyn TransportPort>,
}

impl StreamRouter {
    /// Route onto `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn TransportPort>) -> Self {
        Self { transport }
    }

    /// The transport collaborator.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn TransportPort> {
        &self.transport
    }

    /// Dispatch to the debug stream at `level`.
    ///
    /// Nothing is sent when `level` is above the transport's debug level.
    pub fn debug(&self, level: u32, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.dispatch(Severity::Debug, level, &report.into())
    }

    /// Dispatch to the log stream.
    pub fn log(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.dispatch(Severity::Log, 0, &report.into())
    }

    /// Dispatch to the info stream.
    pub fn info(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.dispatch(Severity::Info, 0, &report.into())
    }

    /// Dispatch to the warning stream.
    pub fn warning(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.dispatch(Severity::Warning, 0, &report.into())
    }

    /// Dispatch to the error stream.
    pub fn error(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.dispatch(Severity::Error, 0, &report.into())
    }

    /// Dispatch to the fatal stream.
    pub fn fatal(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.dispatch(Severity::Fatal, 0, &report.into())
    }

    /// Dispatch to the stream selected by `severity`.
    ///
    /// `level` only matters for the debug stream.
    pub fn dispatch(
        &self,
        severity: Severity,
        level: u32,
        report: &Report,
    ) -> Result<(), DispatchError> {
        let Some(issue) = report.as_reportable() else {
            return Err(DispatchError::Precondition {
                stream: severity.stream_name(),
                payload: report.describe(),
            });
        };

        if severity == Severity::Debug {
            let threshold = self.transport.debug_level();
            if level > threshold {
                tracing::debug!(
                    target: INTERNAL_LOG_TARGET,
                    level,
                    threshold,
                    kind = issue.kind(),
                    "debug dispatch suppressed"
                );
                return Ok(());
            }
        }

        let wire = match report {
            Report::Remote(remote) => remote.clone().with_severity(severity),
            _ => AnyIssue::from_reportable(issue, severity),
        };
        self.transport.send(severity, level, &wire)?;
        Ok(())
    }
}

impl std::fmt::Debug for StreamRouter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StreamRouter")
            .field("debug_level", &self.transport.debug_level())
            .finish()
    }
}
