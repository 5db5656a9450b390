//! Report severities and their stable names.

use ers_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered, closed set of report levels.
///
/// Each severity selects one stream on the transport. `Debug` additionally
/// carries an auxiliary verbosity level at dispatch time (see
/// [`parse_severity_level`]).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Developer diagnostics, filtered by a debug level.
    Debug,
    /// Routine operational log line.
    Log,
    /// Informational event.
    Info,
    /// Something unexpected that did not stop the operation.
    Warning,
    /// An operation failed.
    #[default]
    Error,
    /// The process cannot continue.
    Fatal,
}

impl Severity {
    /// Every severity, lowest first.
    pub const ALL: [Self; 6] = [
        Self::Debug,
        Self::Log,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Fatal,
    ];

    /// Stable upper-case name used on the wire and in rendered output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Log => "LOG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Lower-case stream name (`debug`, `log`, ...).
    #[must_use]
    pub const fn stream_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Log => "log",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Look up a severity by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Result<Self, SeverityError> {
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| SeverityError::Unknown {
                input: name.to_owned(),
            })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = SeverityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::from_name(input.trim())
    }
}

/// Parse a severity with an optional debug level suffix.
///
/// `"DEBUG_2"` yields `(Severity::Debug, 2)`, a bare name yields level 0.
/// Only `DEBUG` accepts a suffix.
pub fn parse_severity_level(input: &str) -> Result<(Severity, u32), SeverityError> {
    let trimmed = input.trim();
    if let Ok(severity) = Severity::from_name(trimmed) {
        return Ok((severity, 0));
    }

    let Some((name, level)) = trimmed.rsplit_once('_') else {
        return Err(SeverityError::Unknown {
            input: trimmed.to_owned(),
        });
    };
    if !name.eq_ignore_ascii_case(Severity::Debug.as_str()) {
        return Err(SeverityError::Unknown {
            input: trimmed.to_owned(),
        });
    }
    let level = level
        .parse::<u32>()
        .map_err(|_| SeverityError::InvalidDebugLevel {
            input: trimmed.to_owned(),
        })?;
    Ok((Severity::Debug, level))
}

/// Severity parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeverityError {
    /// Name does not match any severity.
    Unknown {
        /// Trimmed input.
        input: String,
    },
    /// `DEBUG_<n>` with a suffix that is not a non-negative integer.
    InvalidDebugLevel {
        /// Trimmed input.
        input: String,
    },
}

impl SeverityError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Unknown { .. } => ErrorCode::new("domain", "unknown_severity"),
            Self::InvalidDebugLevel { .. } => ErrorCode::new("domain", "invalid_debug_level"),
        }
    }
}

impl fmt::Display for SeverityError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown { input } => write!(formatter, "unknown severity `{input}`"),
            Self::InvalidDebugLevel { input } => {
                write!(formatter, "debug level in `{input}` must be a non-negative integer")
            },
        }
    }
}

impl std::error::Error for SeverityError {}

impl From<SeverityError> for ErrorEnvelope {
    fn from(error: SeverityError) -> Self {
        let envelope = Self::expected(error.error_code(), error.to_string());
        match error {
            SeverityError::Unknown { input } | SeverityError::InvalidDebugLevel { input } => {
                envelope.with_metadata("input", input)
            },
        }
    }
}
