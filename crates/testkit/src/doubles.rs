//! Transports, sinks and handlers that record what reaches them.

use ers_adapters::LogSink;
use ers_domain::Severity;
use ers_ports::{AnyIssue, LogHandler, LogRecord, TransportPort};
use ers_shared::{ErrorEnvelope, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One transport call: stream, debug level and the wire issue.
#[derive(Debug, Clone)]
pub struct Sent {
    /// Stream primitive that was called.
    pub stream: Severity,
    /// Debug level; zero for every other stream.
    pub level: u32,
    /// Issue handed to the primitive.
    pub issue: AnyIssue,
}

/// Transport that keeps every call in memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    debug_level: u32,
}

impl RecordingTransport {
    /// Recorder with debug level 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder reporting `debug_level` as its threshold.
    pub fn with_debug_level(debug_level: u32) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            debug_level,
        }
    }

    /// Shared handle, ready to pass as `Arc<dyn TransportPort>`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of the calls so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("recording transport lock").clone()
    }

    /// Streams of the calls so far, in order.
    pub fn streams(&self) -> Vec<Severity> {
        self.sent().into_iter().map(|sent| sent.stream).collect()
    }

    /// Number of calls so far.
    pub fn len(&self) -> usize {
        self.sent.lock().expect("recording transport lock").len()
    }

    /// Whether nothing was sent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, stream: Severity, level: u32, issue: &AnyIssue) -> Result<()> {
        self.sent
            .lock()
            .expect("recording transport lock")
            .push(Sent {
                stream,
                level,
                issue: issue.clone(),
            });
        Ok(())
    }
}

impl TransportPort for RecordingTransport {
    fn debug(&self, issue: &AnyIssue, level: u32) -> Result<()> {
        self.push(Severity::Debug, level, issue)
    }

    fn log(&self, issue: &AnyIssue) -> Result<()> {
        self.push(Severity::Log, 0, issue)
    }

    fn info(&self, issue: &AnyIssue) -> Result<()> {
        self.push(Severity::Info, 0, issue)
    }

    fn warning(&self, issue: &AnyIssue) -> Result<()> {
        self.push(Severity::Warning, 0, issue)
    }

    fn error(&self, issue: &AnyIssue) -> Result<()> {
        self.push(Severity::Error, 0, issue)
    }

    fn fatal(&self, issue: &AnyIssue) -> Result<()> {
        self.push(Severity::Fatal, 0, issue)
    }

    fn debug_level(&self) -> u32 {
        self.debug_level
    }
}

/// Transport whose every primitive fails with the same envelope.
#[derive(Debug)]
pub struct FailingTransport {
    error: ErrorEnvelope,
    calls: AtomicUsize,
}

impl FailingTransport {
    /// Fail every call with `error`.
    pub fn new(error: ErrorEnvelope) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of primitives invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

impl TransportPort for FailingTransport {
    fn debug(&self, _issue: &AnyIssue, _level: u32) -> Result<()> {
        self.fail()
    }

    fn log(&self, _issue: &AnyIssue) -> Result<()> {
        self.fail()
    }

    fn info(&self, _issue: &AnyIssue) -> Result<()> {
        self.fail()
    }

    fn warning(&self, _issue: &AnyIssue) -> Result<()> {
        self.fail()
    }

    fn error(&self, _issue: &AnyIssue) -> Result<()> {
        self.fail()
    }

    fn fatal(&self, _issue: &AnyIssue) -> Result<()> {
        self.fail()
    }

    fn debug_level(&self) -> u32 {
        u32::MAX
    }
}

/// Log handler that keeps every record it sees.
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingHandler {
    /// Handler reported under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Records received so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().expect("recording handler lock").clone()
    }

    /// Number of records received.
    pub fn calls(&self) -> usize {
        self.records.lock().expect("recording handler lock").len()
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::named("recording")
    }
}

impl LogHandler for RecordingHandler {
    fn handle(&self, record: &LogRecord) -> Result<()> {
        self.records
            .lock()
            .expect("recording handler lock")
            .push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Line sink kept in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("memory sink lock").clone()
    }

    /// Drain the lines written so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().expect("memory sink lock"))
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .expect("memory sink lock")
            .push(line.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::broker_down_error;
    use ers_domain::{IssueDefaults, PermissionDenied, Reportable};

    fn wire() -> AnyIssue {
        let denied = PermissionDenied::new(&IssueDefaults::default(), None);
        AnyIssue::from_reportable(&denied, Severity::Info)
    }

    #[test]
    fn recording_transport_keeps_stream_and_level() -> Result<()> {
        let transport = RecordingTransport::with_debug_level(4);
        transport.send(Severity::Debug, 3, &wire())?;
        transport.send(Severity::Info, 0, &wire())?;

        assert_eq!(transport.debug_level(), 4);
        assert_eq!(transport.streams(), vec![Severity::Debug, Severity::Info]);
        assert_eq!(transport.sent()[0].level, 3);
        assert_eq!(transport.sent()[1].issue.message(), "Permission denied");
        Ok(())
    }

    #[test]
    fn failing_transport_counts_attempts() {
        let transport = FailingTransport::new(broker_down_error());
        assert!(transport.warning(&wire()).is_err());
        assert!(transport.fatal(&wire()).is_err());
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn memory_sink_drains() {
        let sink = MemorySink::new();
        sink.write_line("a\n");
        sink.write_line("b\n");
        assert_eq!(sink.lines().len(), 2);
        assert_eq!(sink.take(), vec!["a\n".to_owned(), "b\n".to_owned()]);
        assert!(sink.lines().is_empty());
    }
}
