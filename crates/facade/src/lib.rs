//! # ers
//!
//! Facade API for consumers: the configured [`Ers`] service plus re-exports
//! of the issue model, the transports and the configuration loaders.
//! This crate depends on `app`, `adapters`, `config`, `ports`, `domain` and
//! `shared`.

mod service;

pub use service::Ers;

pub use ers_adapters::{
    CatcherGuard, CatchingTransport, FilterTransport, IssueLayer, JsonStreamTransport, LogSink,
    QualifierFilter, SeverityStreamsTransport, StandardStreamTransport, StderrLogSink,
    StdoutLogSink, StreamOutputs, ThrottleLimits, ThrottleTransport,
};
pub use ers_app::{
    DispatchError, HandlerId, HandlerRegistry, InstallMode, IssueHandler, ROOT_LOGGER,
    StreamRouter, as_issue, as_issue_at,
};
pub use ers_config::{
    ErsConfig, ErsEnv, StreamsConfig, ValidatedErsConfig, load_config_from_path,
    load_config_from_sources, load_config_std_env,
};
pub use ers_domain::{
    CallSite, CantOpenFile, Context, Issue, IssueBuilder, IssueDefaults, MAX_CAUSE_DEPTH,
    MESSAGE_KIND, PermissionDenied, ProcessContext, Reportable, Severity, here, params,
    parse_severity_level, render,
};
pub use ers_ports::{AnyIssue, LogHandler, LogLevel, LogRecord, Report, TransportPort};
pub use ers_shared::{ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, Result};

/// Declare an issue kind that can be dispatched directly.
///
/// Same syntax as [`ers_domain::declare_issue!`]; the declared type also
/// converts into a [`Report`], so `ers.error(kind)` needs no `into_issue()`.
///
/// ```
/// use ers::{IssueDefaults, declare_issue};
///
/// declare_issue! {
///     /// A link to a readout unit went down.
///     pub LinkDown("readout::LinkDown") {
///         /// Link number.
///         link: u32,
///     } => "Link {} is down", link;
/// }
///
/// let report = ers::Report::from(LinkDown::new(&IssueDefaults::default(), 4u32, None));
/// assert_eq!(report.describe(), "issue");
/// ```
#[macro_export]
macro_rules! declare_issue {
    (
        $(#[$meta:meta])*
        $vis:vis $name:ident($kind:literal) { $($fields:tt)* } => $($template:tt)*
    ) => {
        $crate::__private::declare_domain_issue! {
            $(#[$meta])*
            $vis $name($kind) { $($fields)* } => $($template)*
        }

        impl ::core::convert::From<$name> for $crate::Report {
            fn from(kind: $name) -> Self {
                $crate::Report::Issue(::core::convert::Into::into(kind))
            }
        }
    };
}

#[doc(hidden)]
pub mod __private {
    pub use ers_domain::declare_issue as declare_domain_issue;
}

/// Returns the facade crate version.
#[must_use]
pub const fn facade_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
