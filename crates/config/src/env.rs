//! Environment variable parsing and override application.
//!
//! Variables are read into a map first so parsing stays deterministic and
//! testable without touching the process environment.

use crate::schema::{ErsConfig, ValidatedErsConfig};
use crate::streams::{StreamsConfig, stream_env_var};
use ers_domain::Severity;
use ers_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::fmt;

/// Rendering verbosity override.
pub const ENV_VERBOSITY_LEVEL: &str = "DUNEDAQ_ERS_VERBOSITY_LEVEL";
/// Debug threshold override.
pub const ENV_DEBUG_LEVEL: &str = "DUNEDAQ_ERS_DEBUG_LEVEL";
/// Application name override.
pub const ENV_APPLICATION_NAME: &str = "DUNEDAQ_APPLICATION_NAME";
/// Comma-separated default qualifiers.
pub const ENV_QUALIFIERS: &str = "DUNEDAQ_ERS_QUALIFIERS";

/// Upper bound on comma-separated list items read from the environment.
pub const MAX_CSV_ITEMS: usize = 64;

const ENV_VARS: [&str; 4] = [
    ENV_VERBOSITY_LEVEL,
    ENV_DEBUG_LEVEL,
    ENV_APPLICATION_NAME,
    ENV_QUALIFIERS,
];

/// Parsed environment overrides. Unset variables are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErsEnv {
    /// `DUNEDAQ_ERS_VERBOSITY_LEVEL`.
    pub verbosity_level: Option<i32>,
    /// `DUNEDAQ_ERS_DEBUG_LEVEL`.
    pub debug_level: Option<u32>,
    /// `DUNEDAQ_APPLICATION_NAME`.
    pub application_name: Option<String>,
    /// `DUNEDAQ_ERS_QUALIFIERS`; an empty value clears the list.
    pub qualifiers: Option<Vec<String>>,
    /// `DUNEDAQ_ERS_<SEVERITY>` stream chains, such as `DUNEDAQ_ERS_ERROR`.
    pub streams: StreamsConfig,
}

impl ErsEnv {
    /// Parse overrides from an explicit variable map.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        let mut streams = StreamsConfig::default();
        for severity in Severity::ALL {
            let var = stream_env_var(severity);
            if let Some(definition) = parse_optional_trimmed_string(map, var)? {
                streams.set(severity, definition);
            }
        }
        Ok(Self {
            verbosity_level: parse_optional_i32(map, ENV_VERBOSITY_LEVEL)?,
            debug_level: parse_optional_u32(map, ENV_DEBUG_LEVEL)?,
            application_name: parse_optional_trimmed_string(map, ENV_APPLICATION_NAME)?,
            qualifiers: parse_optional_csv(map, ENV_QUALIFIERS)?,
            streams,
        })
    }

    /// Parse overrides from the process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        let names = ENV_VARS
            .into_iter()
            .chain(Severity::ALL.into_iter().map(stream_env_var));
        for name in names {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_owned(), value);
            }
        }
        Self::from_map(&map)
    }

    /// Whether no variable was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verbosity_level.is_none()
            && self.debug_level.is_none()
            && self.application_name.is_none()
            && self.qualifiers.is_none()
            && self.streams.is_empty()
    }
}

/// Apply environment overrides to a base config, then validate.
pub fn apply_env_overrides(
    base: ErsConfig,
    env: &ErsEnv,
) -> Result<ValidatedErsConfig, ErrorEnvelope> {
    let mut config = base;
    if let Some(level) = env.verbosity_level {
        config.verbosity_level = level;
    }
    if let Some(level) = env.debug_level {
        config.debug_level = level;
    }
    if let Some(name) = &env.application_name {
        config.application_name.clone_from(name);
    }
    if let Some(qualifiers) = &env.qualifiers {
        config.qualifiers.clone_from(qualifiers);
    }
    for severity in Severity::ALL {
        if let Some(definition) = env.streams.get(severity) {
            config.streams.set(severity, definition);
        }
    }

    config.validate_and_normalize().map_err(Into::into)
}

/// Typed errors for environment parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// The variable is set but blank.
    EmptyValue {
        /// Variable name.
        var: &'static str,
    },
    /// The variable is not an integer in range.
    InvalidInt {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
    /// The list has too many items.
    CsvTooLarge {
        /// Variable name.
        var: &'static str,
        /// Number of items.
        len: usize,
        /// Maximum allowed.
        max: usize,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } => ErrorCode::new("config", "env_empty_value"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "env_invalid_int"),
            Self::CsvTooLarge { .. } => ErrorCode::new("config", "env_csv_too_large"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } => write!(formatter, "{var} is set but empty"),
            Self::InvalidInt { var, value } => {
                write!(formatter, "{var} must be an integer (got {value:?})")
            },
            Self::CsvTooLarge { var, len, max } => {
                write!(formatter, "{var} has {len} items (max {max})")
            },
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } => {
                envelope = envelope.with_metadata("var", var);
            },
            EnvParseError::InvalidInt { var, value } => {
                envelope = envelope
                    .with_metadata("var", var)
                    .with_metadata("value", value);
            },
            EnvParseError::CsvTooLarge { var, len, max } => {
                envelope = envelope
                    .with_metadata("var", var)
                    .with_metadata("len", len.to_string())
                    .with_metadata("max", max.to_string());
            },
        }

        envelope
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<String>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }
    Ok(Some(trimmed.to_owned()))
}

fn parse_optional_i32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<i32>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    trimmed
        .parse::<i32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: trimmed,
        })
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(trimmed) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: trimmed,
        })
}

fn parse_optional_csv(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Vec<String>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let items = parse_csv(raw);
    if items.len() > MAX_CSV_ITEMS {
        return Err(EnvParseError::CsvTooLarge {
            var,
            len: items.len(),
            max: MAX_CSV_ITEMS,
        });
    }
    Ok(Some(items))
}

fn parse_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn env_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn missing_variables_parse_to_none() -> Result<(), Box<dyn Error>> {
        let env = ErsEnv::from_map(&BTreeMap::new())?;
        assert!(env.is_empty());
        Ok(())
    }

    #[test]
    fn levels_accept_surrounding_whitespace() -> Result<(), Box<dyn Error>> {
        let env = ErsEnv::from_map(&env_map(&[
            (ENV_VERBOSITY_LEVEL, " -2 "),
            (ENV_DEBUG_LEVEL, "3"),
        ]))?;
        assert_eq!(env.verbosity_level, Some(-2));
        assert_eq!(env.debug_level, Some(3));
        Ok(())
    }

    #[test]
    fn invalid_and_empty_values_are_rejected() {
        let error = ErsEnv::from_map(&env_map(&[(ENV_DEBUG_LEVEL, "-1")])).err();
        assert_eq!(
            error,
            Some(EnvParseError::InvalidInt {
                var: ENV_DEBUG_LEVEL,
                value: "-1".to_owned(),
            })
        );

        let error = ErsEnv::from_map(&env_map(&[(ENV_APPLICATION_NAME, "  ")])).err();
        assert_eq!(
            error,
            Some(EnvParseError::EmptyValue {
                var: ENV_APPLICATION_NAME
            })
        );
    }

    #[test]
    fn qualifier_lists_are_split_and_trimmed() -> Result<(), Box<dyn Error>> {
        let env = ErsEnv::from_map(&env_map(&[(ENV_QUALIFIERS, "daq, readout,,")]))?;
        assert_eq!(
            env.qualifiers,
            Some(vec!["daq".to_owned(), "readout".to_owned()])
        );

        let cleared = ErsEnv::from_map(&env_map(&[(ENV_QUALIFIERS, "")]))?;
        assert_eq!(cleared.qualifiers, Some(Vec::new()));
        Ok(())
    }

    #[test]
    fn oversized_qualifier_lists_are_rejected() {
        let raw = (0..=MAX_CSV_ITEMS)
            .map(|index| format!("q{index}"))
            .collect::<Vec<_>>()
            .join(",");
        let error = ErsEnv::from_map(&env_map(&[(ENV_QUALIFIERS, raw.as_str())])).err();
        assert!(matches!(error, Some(EnvParseError::CsvTooLarge { len: 65, .. })));
    }

    #[test]
    fn stream_chains_are_read_per_severity() -> Result<(), Box<dyn Error>> {
        let env = ErsEnv::from_map(&env_map(&[
            ("DUNEDAQ_ERS_ERROR", " throttle(5,10),lstdout "),
            ("DUNEDAQ_ERS_DEBUG_LEVEL", "2"),
        ]))?;
        assert_eq!(env.streams.get(Severity::Error), Some("throttle(5,10),lstdout"));
        assert_eq!(env.streams.get(Severity::Debug), None);
        assert_eq!(env.debug_level, Some(2));

        let base = ErsConfig::default();
        let config = apply_env_overrides(base, &env)?;
        let chain = config.stream_chain(Severity::Error);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].argument(), Some("5,10"));
        Ok(())
    }

    #[test]
    fn malformed_stream_variables_fail_validation() -> Result<(), Box<dyn Error>> {
        let env = ErsEnv::from_map(&env_map(&[("DUNEDAQ_ERS_WARNING", "filter(daq,lstderr")]))?;
        let error = apply_env_overrides(ErsConfig::default(), &env).err();
        assert!(matches!(
            error,
            Some(ref envelope) if envelope.code == ErrorCode::new("config", "invalid_stream_definition")
        ));
        Ok(())
    }

    #[test]
    fn env_errors_carry_the_variable_name() {
        let envelope: ErrorEnvelope = EnvParseError::InvalidInt {
            var: ENV_VERBOSITY_LEVEL,
            value: "loud".to_owned(),
        }
        .into();
        assert_eq!(envelope.code, ErrorCode::new("config", "env_invalid_int"));
        assert_eq!(
            envelope.metadata.get("var").map(String::as_str),
            Some(ENV_VERBOSITY_LEVEL)
        );
    }

    #[test]
    fn overrides_replace_base_values() -> Result<(), Box<dyn Error>> {
        let env = ErsEnv {
            verbosity_level: Some(2),
            application_name: Some("readout".to_owned()),
            qualifiers: Some(vec!["daq".to_owned()]),
            ..ErsEnv::default()
        };
        let base = ErsConfig {
            debug_level: 4,
            qualifiers: vec!["file".to_owned()],
            ..ErsConfig::default()
        };

        let config = apply_env_overrides(base, &env)?;
        assert_eq!(config.verbosity_level(), 2);
        assert_eq!(config.debug_level(), 4);
        assert_eq!(config.application_name(), "readout");
        assert_eq!(config.qualifiers(), ["daq"]);
        Ok(())
    }
}
