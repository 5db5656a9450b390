//! Conventional logging boundary contract.
//!
//! A logging facility produces [`LogRecord`]s and hands them to every
//! [`LogHandler`] attached to the record's logger.

use crate::transport::Report;
use ers_domain::CallSite;
use ers_shared::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Level declared by a conventional log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Critical.
    Critical,
}

impl LogLevel {
    /// Lower-case level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Unknown log level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLogLevelError {
    /// Rejected input.
    pub input: String,
}

impl fmt::Display for ParseLogLevelError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "invalid log level `{}`", self.input)
    }
}

impl std::error::Error for ParseLogLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" | "err" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            _ => Err(ParseLogLevelError {
                input: input.to_owned(),
            }),
        }
    }
}

/// Extra structured fields of a record.
pub type LogFields = BTreeMap<String, String>;

/// One conventional log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Dotted logger name; the root logger is `""`.
    pub logger: String,
    /// Declared level.
    pub level: LogLevel,
    /// Formatted message or an issue passed as the payload.
    pub payload: Report,
    /// Location of the log statement.
    pub site: CallSite,
    /// Structured fields beyond the message.
    pub fields: LogFields,
}

impl LogRecord {
    /// Record carrying a formatted text message.
    pub fn text(
        logger: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
        site: CallSite,
    ) -> Self {
        Self::new(logger, level, Report::Text(message.into()), site)
    }

    /// Record carrying any payload.
    pub fn new(logger: impl Into<String>, level: LogLevel, payload: Report, site: CallSite) -> Self {
        Self {
            logger: logger.into(),
            level,
            payload,
            site,
            fields: LogFields::new(),
        }
    }

    /// Attach a structured field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A handler attached to a logger.
pub trait LogHandler: Send + Sync {
    /// Process one record.
    fn handle(&self, record: &LogRecord) -> Result<()>;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        "handler"
    }
}
