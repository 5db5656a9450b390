//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Extension helpers mirroring common `Result` combinators.
pub trait ResultExt<T, E> {
    /// Map the success value, preserving the error.
    fn map_ok<U, F>(self, op: F) -> Result<U, E>
    where
        F: FnOnce(T) -> U;

    /// Convert the error into an envelope and attach one metadata entry.
    fn with_error_metadata(
        self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<T, ErrorEnvelope>
    where
        E: Into<ErrorEnvelope>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn map_ok<U, F>(self, op: F) -> Result<U, E>
    where
        F: FnOnce(T) -> U,
    {
        self.map(op)
    }

    fn with_error_metadata(
        self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<T, ErrorEnvelope>
    where
        E: Into<ErrorEnvelope>,
    {
        self.map_err(|error| error.into().with_metadata(key, value))
    }
}
