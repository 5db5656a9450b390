//! # ers-app
//!
//! Use cases of the error reporting service: routing issues onto severity
//! streams, bridging conventional log records into issues, and keeping the
//! logger handler lists. This crate depends on `ports`, `domain`, and
//! `shared`.

pub mod bridge;
pub mod registry;
pub mod router;

pub use bridge::{IssueHandler, as_issue, as_issue_at, debug_text, info_text, log_text};
pub use registry::{HandlerId, HandlerRegistry, InstallMode, ROOT_LOGGER};
pub use router::{DispatchError, StreamRouter};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ers_domain::domain_crate_version;
    use ers_ports::ports_crate_version;
    use ers_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        let ports_version = ports_crate_version();
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!ports_version.is_empty());
        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}
