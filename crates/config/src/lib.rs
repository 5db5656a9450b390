//! # ers-config
//!
//! Configuration schema, validation, and normalization for the error
//! reporting service. Values come from defaults, an optional JSON or TOML
//! file, and `DUNEDAQ_*` environment variables, in increasing precedence.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;
/// Per-severity stream chain definitions.
pub mod streams;

pub use env::{
    ENV_APPLICATION_NAME, ENV_DEBUG_LEVEL, ENV_QUALIFIERS, ENV_VERBOSITY_LEVEL, EnvParseError,
    ErsEnv, apply_env_overrides,
};
pub use load::{
    load_config_from_path, load_config_from_sources, load_config_std_env, to_pretty_json,
    to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ConfigSchemaError, DEBUG_LEVEL_MAX, ErsConfig, MAX_QUALIFIERS,
    VERBOSITY_MAX, VERBOSITY_MIN, ValidatedErsConfig, parse_ers_config_json,
    parse_ers_config_toml,
};
pub use streams::{
    ENV_STREAM_PREFIX, StreamDefinitionError, StreamSpec, StreamsConfig,
    default_stream_definition, parse_stream_definition, split_stream_definition, stream_env_var,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
