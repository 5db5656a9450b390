//! Per-severity output stream chains.
//!
//! A chain is a comma-separated list of stream elements such as
//! `throttle(30,30),filter(daq,!hsi),lstderr`. Commas inside brackets belong
//! to the element's argument. Each severity reads its chain from
//! `DUNEDAQ_ERS_<SEVERITY>` or the `streams` config section, falling back
//! to a built-in default.

use ers_domain::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of the per-severity stream variables (`DUNEDAQ_ERS_WARNING`).
pub const ENV_STREAM_PREFIX: &str = "DUNEDAQ_ERS_";

const SEPARATOR: char = ',';

/// Built-in chain for a severity.
#[must_use]
pub const fn default_stream_definition(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug | Severity::Log => "lstdout",
        Severity::Info => "throttle,lstdout",
        Severity::Warning | Severity::Error => "throttle,lstderr",
        Severity::Fatal => "lstderr",
    }
}

/// Environment variable holding the chain of `severity`.
#[must_use]
pub const fn stream_env_var(severity: Severity) -> &'static str {
    match severity {
        Severity::Debug => "DUNEDAQ_ERS_DEBUG",
        Severity::Log => "DUNEDAQ_ERS_LOG",
        Severity::Info => "DUNEDAQ_ERS_INFO",
        Severity::Warning => "DUNEDAQ_ERS_WARNING",
        Severity::Error => "DUNEDAQ_ERS_ERROR",
        Severity::Fatal => "DUNEDAQ_ERS_FATAL",
    }
}

/// Stream chains configured per severity. Unset entries use the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct StreamsConfig {
    /// Chain of the debug stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
    /// Chain of the log stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    /// Chain of the info stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Chain of the warning stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Chain of the error stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Chain of the fatal stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl StreamsConfig {
    /// Configured chain of `severity`, if any.
    #[must_use]
    pub fn get(&self, severity: Severity) -> Option<&str> {
        match severity {
            Severity::Debug => self.debug.as_deref(),
            Severity::Log => self.log.as_deref(),
            Severity::Info => self.info.as_deref(),
            Severity::Warning => self.warning.as_deref(),
            Severity::Error => self.error.as_deref(),
            Severity::Fatal => self.fatal.as_deref(),
        }
    }

    /// Replace the chain of `severity`.
    pub fn set(&mut self, severity: Severity, definition: impl Into<String>) {
        *self.slot_mut(severity) = Some(definition.into());
    }

    /// Whether no severity is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Severity::ALL.into_iter().all(|severity| self.get(severity).is_none())
    }

    fn slot_mut(&mut self, severity: Severity) -> &mut Option<String> {
        match severity {
            Severity::Debug => &mut self.debug,
            Severity::Log => &mut self.log,
            Severity::Info => &mut self.info,
            Severity::Warning => &mut self.warning,
            Severity::Error => &mut self.error,
            Severity::Fatal => &mut self.fatal,
        }
    }
}

/// One element of a chain: a stream name and its bracketed argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    name: String,
    argument: Option<String>,
}

impl StreamSpec {
    /// Stream name, such as `lstderr` or `throttle`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text between the brackets, when present.
    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    fn parse(element: &str, definition: &str) -> Result<Self, StreamDefinitionError> {
        let syntax = || StreamDefinitionError::Syntax {
            definition: definition.to_owned(),
        };
        let Some((name, rest)) = element.split_once('(') else {
            return Ok(Self {
                name: element.to_owned(),
                argument: None,
            });
        };
        let argument = rest.strip_suffix(')').ok_or_else(syntax)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(syntax());
        }
        Ok(Self {
            name: name.to_owned(),
            argument: Some(argument.trim().to_owned()),
        })
    }
}

impl fmt::Display for StreamSpec {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(formatter, "{}({argument})", self.name),
            None => formatter.write_str(&self.name),
        }
    }
}

/// Split a chain on commas outside brackets. Blank elements are dropped.
pub fn split_stream_definition(definition: &str) -> Result<Vec<&str>, StreamDefinitionError> {
    let syntax = || StreamDefinitionError::Syntax {
        definition: definition.to_owned(),
    };
    let mut elements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (offset, character) in definition.char_indices() {
        match character {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or_else(syntax)?,
            SEPARATOR if depth == 0 => {
                elements.push(definition.get(start..offset).unwrap_or_default());
                start = offset + SEPARATOR.len_utf8();
            },
            _ => {},
        }
    }
    if depth != 0 {
        return Err(syntax());
    }
    elements.push(definition.get(start..).unwrap_or_default());

    Ok(elements
        .into_iter()
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .collect())
}

/// Parse a chain definition into its elements, head first.
pub fn parse_stream_definition(definition: &str) -> Result<Vec<StreamSpec>, StreamDefinitionError> {
    split_stream_definition(definition)?
        .into_iter()
        .map(|element| StreamSpec::parse(element, definition))
        .collect()
}

/// Malformed chain definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDefinitionError {
    /// Unbalanced brackets or text after a closing bracket.
    Syntax {
        /// The whole definition.
        definition: String,
    },
}

impl fmt::Display for StreamDefinitionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { definition } => write!(
                formatter,
                "the stream configuration string \"{definition}\" has syntax errors"
            ),
        }
    }
}

impl std::error::Error for StreamDefinitionError {}
