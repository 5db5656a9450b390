//! Reporting configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims names and keeps qualifiers unique in first-seen order.

use crate::streams::{StreamSpec, StreamsConfig, default_stream_definition, parse_stream_definition};
use ers_domain::{DEFAULT_APPLICATION_NAME, IssueDefaults, Severity};
use ers_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Lowest accepted verbosity (message only).
pub const VERBOSITY_MIN: i32 = -3;
/// Highest accepted verbosity.
pub const VERBOSITY_MAX: i32 = 16;
/// Highest accepted debug level.
pub const DEBUG_LEVEL_MAX: u32 = 16;
/// Maximum number of default qualifiers.
pub const MAX_QUALIFIERS: usize = 64;

/// Process-wide reporting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ErsConfig {
    /// Schema version.
    pub version: u32,
    /// How much call-site detail rendered output carries.
    pub verbosity_level: i32,
    /// Highest debug level that is dispatched.
    pub debug_level: u32,
    /// Logical application name stamped on every context.
    pub application_name: String,
    /// Qualifiers appended to every issue.
    pub qualifiers: Vec<String>,
    /// Output stream chain per severity.
    #[serde(skip_serializing_if = "StreamsConfig::is_empty")]
    pub streams: StreamsConfig,
}

impl Default for ErsConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            verbosity_level: 0,
            debug_level: 0,
            application_name: DEFAULT_APPLICATION_NAME.to_owned(),
            qualifiers: Vec::new(),
            streams: StreamsConfig::default(),
        }
    }
}

impl ErsConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedErsConfig, ConfigSchemaError> {
        self.validate_version()?;

        if !(VERBOSITY_MIN..=VERBOSITY_MAX).contains(&self.verbosity_level) {
            return Err(ConfigSchemaError::LevelOutOfRange {
                field: "verbosityLevel",
                value: i64::from(self.verbosity_level),
                min: i64::from(VERBOSITY_MIN),
                max: i64::from(VERBOSITY_MAX),
            });
        }
        if self.debug_level > DEBUG_LEVEL_MAX {
            return Err(ConfigSchemaError::LevelOutOfRange {
                field: "debugLevel",
                value: i64::from(self.debug_level),
                min: 0,
                max: i64::from(DEBUG_LEVEL_MAX),
            });
        }

        let application_name = self.application_name.trim();
        if application_name.is_empty() {
            return Err(ConfigSchemaError::EmptyApplicationName);
        }
        self.application_name = application_name.to_owned();

        self.qualifiers = normalize_qualifiers(self.qualifiers);
        if self.qualifiers.len() > MAX_QUALIFIERS {
            return Err(ConfigSchemaError::TooManyQualifiers {
                len: self.qualifiers.len(),
                max: MAX_QUALIFIERS,
            });
        }

        let mut stream_chains = BTreeMap::new();
        for severity in Severity::ALL {
            let definition = self
                .streams
                .get(severity)
                .unwrap_or_else(|| default_stream_definition(severity));
            let chain = parse_stream_definition(definition).map_err(|_| {
                ConfigSchemaError::InvalidStreamDefinition {
                    stream: severity.stream_name(),
                    definition: definition.to_owned(),
                }
            })?;
            stream_chains.insert(severity, chain);
        }

        Ok(ValidatedErsConfig {
            raw: self,
            stream_chains,
        })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }
}

fn normalize_qualifiers(qualifiers: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(qualifiers.len());
    for qualifier in qualifiers {
        let trimmed = qualifier.trim();
        if trimmed.is_empty() || normalized.iter().any(|seen| seen == trimmed) {
            continue;
        }
        normalized.push(trimmed.to_owned());
    }
    normalized
}

/// Validated, immutable configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedErsConfig {
    raw: ErsConfig,
    stream_chains: BTreeMap<Severity, Vec<StreamSpec>>,
}

impl ValidatedErsConfig {
    /// Rendering verbosity.
    #[must_use]
    pub const fn verbosity_level(&self) -> i32 {
        self.raw.verbosity_level
    }

    /// Debug dispatch threshold.
    #[must_use]
    pub const fn debug_level(&self) -> u32 {
        self.raw.debug_level
    }

    /// Application name.
    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.raw.application_name
    }

    /// Default qualifiers.
    #[must_use]
    pub fn qualifiers(&self) -> &[String] {
        &self.raw.qualifiers
    }

    /// Parsed stream chain of `severity`, head first.
    #[must_use]
    pub fn stream_chain(&self, severity: Severity) -> &[StreamSpec] {
        self.stream_chains.get(&severity).map_or(&[], Vec::as_slice)
    }

    /// Constructor inputs for every issue raised under this config.
    #[must_use]
    pub fn issue_defaults(&self) -> IssueDefaults {
        IssueDefaults::new(self.raw.application_name.clone(), self.raw.qualifiers.clone())
    }

    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &ErsConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> ErsConfig {
        self.raw
    }
}

/// Parse a config from a JSON string, applying validation and normalization.
pub fn parse_ers_config_json(input: &str) -> Result<ValidatedErsConfig, ErrorEnvelope> {
    let config: ErsConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a config from a TOML string, applying validation and normalization.
pub fn parse_ers_config_toml(input: &str) -> Result<ValidatedErsConfig, ErrorEnvelope> {
    let config: ErsConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A level is out of bounds.
    LevelOutOfRange {
        /// Field name in the config file.
        field: &'static str,
        /// Value provided.
        value: i64,
        /// Minimum allowed value.
        min: i64,
        /// Maximum allowed value.
        max: i64,
    },
    /// The application name is blank.
    EmptyApplicationName,
    /// Too many default qualifiers after normalization.
    TooManyQualifiers {
        /// Number of qualifiers.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },
    /// A stream chain definition has syntax errors.
    InvalidStreamDefinition {
        /// Stream the chain belongs to.
        stream: &'static str,
        /// The rejected definition.
        definition: String,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::LevelOutOfRange { .. } => ErrorCode::new("config", "level_out_of_range"),
            Self::EmptyApplicationName => ErrorCode::new("config", "empty_application_name"),
            Self::TooManyQualifiers { .. } => ErrorCode::new("config", "too_many_qualifiers"),
            Self::InvalidStreamDefinition { .. } => {
                ErrorCode::new("config", "invalid_stream_definition")
            },
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => write!(
                formatter,
                "unsupported config version {found} (supported: {supported})"
            ),
            Self::LevelOutOfRange {
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{field} must be between {min} and {max} (got {value})"
            ),
            Self::EmptyApplicationName => formatter.write_str("applicationName must be non-empty"),
            Self::TooManyQualifiers { len, max } => {
                write!(formatter, "qualifiers has {len} entries (max {max})")
            },
            Self::InvalidStreamDefinition { stream, definition } => write!(
                formatter,
                "the {stream} stream configuration string \"{definition}\" has syntax errors"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::LevelOutOfRange {
                field,
                value,
                min,
                max,
            } => {
                envelope = envelope
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::EmptyApplicationName => {
                envelope = envelope.with_metadata("field", "applicationName");
            },
            ConfigSchemaError::TooManyQualifiers { len, max } => {
                envelope = envelope
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::InvalidStreamDefinition { stream, definition } => {
                envelope = envelope
                    .with_metadata("stream", stream)
                    .with_metadata("definition", definition);
            },
        }

        envelope
    }
}
