//! # ers-domain
//!
//! The issue model of the error reporting service.
//!
//! This crate contains the pieces every report is made of, with no transport
//! or configuration dependencies:
//!
//! - **Severity** - `Severity`, `parse_severity_level`
//! - **Sites** - `CallSite` and the `here!` macro
//! - **Context** - `Context`, `ProcessContext`, `IssueDefaults`
//! - **Issues** - `Issue`, `IssueBuilder`, `Reportable`, `params!`
//! - **Kinds** - `declare_issue!`, `PermissionDenied`, `CantOpenFile`
//! - **Rendering** - `render` with verbosity tiers and bounded cause chains
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - Process queries never fail; missing data becomes documented defaults
//! - Configuration arrives as `IssueDefaults`, never from the environment

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use ers_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod cause;
pub mod context;
pub mod issue;
pub mod kinds;
pub mod render;
pub mod severity;
pub mod site;

pub use cause::{Chain, MAX_CAUSE_DEPTH, STD_ERROR_KIND, error_chain_messages};
pub use context::{
    Context, DEFAULT_APPLICATION_NAME, IssueDefaults, ProcessContext, ProcessParts,
    reduce_thread_id,
};
pub use issue::{ISSUE_KIND, Issue, IssueBuilder, MESSAGE_KIND, Parameters, Reportable};
pub use kinds::{CantOpenFile, PermissionDenied};
pub use render::{TIME_FORMAT, position, render};
pub use severity::{Severity, SeverityError, parse_severity_level};
pub use site::{ARGUMENTS_PLACEHOLDER, CallSite, UNKNOWN_FUNCTION};

/// Tracing target of the engine's own diagnostics.
///
/// Bridges that feed tracing events back into the engine skip this target.
pub const INTERNAL_LOG_TARGET: &str = "ers::internal";

#[doc(hidden)]
pub mod __private {
    pub use chrono::{DateTime, Utc};
}

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn domain_depends_on_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }
}
