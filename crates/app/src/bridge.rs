//! Logging bridge: conventional log records in, routed issues out.

use crate::router::{DispatchError, StreamRouter};
use ers_domain::{CallSite, Issue, IssueDefaults, MESSAGE_KIND};
use ers_ports::{LogHandler, LogLevel, LogRecord, Report};
use ers_shared::Result;

/// Wrap free text in a `Message` issue captured at the caller.
#[track_caller]
pub fn as_issue(defaults: &IssueDefaults, text: impl Into<String>) -> Issue {
    Issue::builder(MESSAGE_KIND, text).build(defaults)
}

/// Wrap free text in a `Message` issue with an explicit call site.
pub fn as_issue_at(site: CallSite, defaults: &IssueDefaults, text: impl Into<String>) -> Issue {
    Issue::builder(MESSAGE_KIND, text).site(site).build(defaults)
}

/// Send free text to the debug stream.
#[track_caller]
pub fn debug_text(
    router: &StreamRouter,
    defaults: &IssueDefaults,
    level: u32,
    text: impl Into<String>,
) -> Result<(), DispatchError> {
    router.debug(level, as_issue(defaults, text))
}

/// Send free text to the log stream.
#[track_caller]
pub fn log_text(
    router: &StreamRouter,
    defaults: &IssueDefaults,
    text: impl Into<String>,
) -> Result<(), DispatchError> {
    router.log(as_issue(defaults, text))
}

/// Send free text to the info stream.
#[track_caller]
pub fn info_text(
    router: &StreamRouter,
    defaults: &IssueDefaults,
    text: impl Into<String>,
) -> Result<(), DispatchError> {
    router.info(as_issue(defaults, text))
}

/// Handler that turns every record into an issue dispatch.
///
/// Issue payloads are forwarded unchanged. Text payloads become `Message`
/// issues whose call site is the record's, with the record's fields as
/// parameters. The stream follows the record level:
///
/// | level | stream |
/// |---|---|
/// | debug | debug (level 0) |
/// | info | info |
/// | warning | warning |
/// | error | error |
/// | critical | fatal |
#[derive(Debug, Clone)]
pub struct IssueHandler {
    router: StreamRouter,
    defaults: IssueDefaults,
}

impl IssueHandler {
    /// Create a handler dispatching through `router`.
    #[must_use]
    pub const fn new(router: StreamRouter, defaults: IssueDefaults) -> Self {
        Self { router, defaults }
    }

    /// Build the issue payload for a record.
    #[must_use]
    pub fn payload(&self, record: &LogRecord) -> Report {
        match &record.payload {
            Report::Text(text) => Issue::builder(MESSAGE_KIND, text.as_str())
                .site(record.site.clone())
                .parameters(&record.fields)
                .build(&self.defaults)
                .into(),
            issue => issue.clone(),
        }
    }

    /// Wrap and route one record.
    pub fn route(&self, record: &LogRecord) -> Result<(), DispatchError> {
        let payload = self.payload(record);
        match record.level {
            LogLevel::Debug => self.router.debug(0, payload),
            LogLevel::Info => self.router.info(payload),
            LogLevel::Warning => self.router.warning(payload),
            LogLevel::Error => self.router.error(payload),
            LogLevel::Critical => self.router.fatal(payload),
        }
    }
}

impl LogHandler for IssueHandler {
    fn handle(&self, record: &LogRecord) -> Result<()> {
        self.route(record).map_err(Into::into)
    }

    fn name(&self) -> &str {
        "ers"
    }
}
