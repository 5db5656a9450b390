//! Test fixtures for shared error codes and envelopes.

use ers_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Error codes the engine itself can surface.
pub fn engine_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::invalid_input(),
        ErrorCode::precondition_failed(),
        ErrorCode::transport(),
        ErrorCode::internal(),
    ]
}

/// A retriable transport failure, as a broker outage would report it.
pub fn broker_down_error() -> ErrorEnvelope {
    ErrorEnvelope::transport("broker down", ErrorClass::Retriable)
}

/// A permanent transport failure.
pub fn sink_closed_error() -> ErrorEnvelope {
    ErrorEnvelope::transport("sink closed", ErrorClass::NonRetriable)
}
