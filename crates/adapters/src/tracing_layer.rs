//! Bridge from `tracing` events into the logging boundary.
//!
//! [`IssueLayer`] turns every event into a [`LogRecord`] and hands it to a
//! [`LogHandler`], normally the issue handler of the app layer. Events on the
//! engine's own target are skipped so its diagnostics never loop back.
//!
//! The function of the recorded call site is the innermost enclosing span,
//! or the event's own name outside any span.

use ers_domain::{CallSite, INTERNAL_LOG_TARGET};
use ers_ports::{LogFields, LogHandler, LogLevel, LogRecord};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

const UNKNOWN_FILE: &str = "<unknown>";

/// Map a tracing level onto the conventional log levels.
#[must_use]
pub fn log_level(level: &Level) -> LogLevel {
    if *level == Level::ERROR {
        LogLevel::Error
    } else if *level == Level::WARN {
        LogLevel::Warning
    } else if *level == Level::INFO {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

/// Dotted logger name for a tracing target (`a::b` becomes `a.b`).
#[must_use]
pub fn logger_name(target: &str) -> String {
    target.replace("::", ".")
}

fn is_internal(target: &str) -> bool {
    target
        .strip_prefix(INTERNAL_LOG_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// `tracing_subscriber` layer feeding events to a [`LogHandler`].
#[derive(Clone)]
pub struct IssueLayer {
    handler: Arc<dyn LogHandler>,
}

impl IssueLayer {
    /// Create a layer delivering to `handler`.
    #[must_use]
    pub fn new(handler: Arc<dyn LogHandler>) -> Self {
        Self { handler }
    }

    /// Convert one event into a record, or `None` for internal events.
    ///
    /// `span` names the innermost span the event was raised in.
    pub fn record_for(event: &Event<'_>, span: Option<&str>) -> Option<LogRecord> {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return None;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let site = CallSite::new(
            metadata.module_path().unwrap_or_else(|| metadata.target()),
            metadata.file().unwrap_or(UNKNOWN_FILE),
            metadata.line().unwrap_or_default(),
            span.unwrap_or_else(|| metadata.name()),
        );
        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_owned());

        let mut record = LogRecord::text(
            logger_name(metadata.target()),
            log_level(metadata.level()),
            message,
            site,
        );
        record.fields = visitor.fields;
        Some(record)
    }
}

impl fmt::Debug for IssueLayer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IssueLayer")
            .field("handler", &self.handler.name())
            .finish()
    }
}

impl<S> Layer<S> for IssueLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let span = ctx.event_span(event).map(|span| span.name());
        let Some(record) = Self::record_for(event, span) else {
            return;
        };
        if let Err(error) = self.handler.handle(&record) {
            eprintln!(
                "ers: handler `{}` failed for logger `{}`: {error}",
                self.handler.name(),
                record.logger
            );
        }
    }
}

/// Collects the message and the remaining fields of an event.
#[derive(Debug, Default)]
struct FieldVisitor {
    fields: LogFields,
    message: Option<String>,
}

impl FieldVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_owned(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_owned());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{value:?}"));
    }
}
