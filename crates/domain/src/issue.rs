//! The issue record and its builder.

use crate::cause::{Chain, STD_ERROR_KIND, error_chain_messages};
use crate::context::{Context, IssueDefaults, ProcessContext};
use crate::severity::Severity;
use crate::site::CallSite;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// Textual parameters attached to an issue.
pub type Parameters = BTreeMap<String, String>;

/// Kind of issues built with [`Issue::new`].
pub const ISSUE_KIND: &str = "ers::Issue";

/// Kind of issues that wrap free text.
pub const MESSAGE_KIND: &str = "ers::Message";

/// Build a [`Parameters`] map, coercing keys and values with `ToString`.
///
/// ```
/// let parameters = ers_domain::params! { "filename" => "t1", "error" => 1 };
/// assert_eq!(parameters.get("error").map(String::as_str), Some("1"));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Parameters::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut parameters = $crate::Parameters::new();
        $(
            parameters.insert(
                ::std::string::ToString::to_string(&$key),
                ::std::string::ToString::to_string(&$value),
            );
        )+
        parameters
    }};
}

/// A structured, contextualized report.
///
/// Everything except qualifiers and severity is fixed at construction. The
/// cause is owned exclusively, so a chain lives exactly as long as its
/// newest issue.
///
/// Cloning, comparison and `Debug` walk the chain iteratively, so chains
/// of any length are safe to copy and print.
pub struct Issue {
    kind: String,
    message: String,
    time: DateTime<Utc>,
    severity: Severity,
    parameters: Parameters,
    qualifiers: Vec<String>,
    cause: Option<Box<Issue>>,
    context: Context,
}

impl Issue {
    /// Build a plain issue at the caller's location.
    #[track_caller]
    pub fn new<I, K, V>(
        defaults: &IssueDefaults,
        message: impl Into<String>,
        parameters: I,
        cause: Option<Self>,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        let builder = IssueBuilder::new(ISSUE_KIND, message).parameters(parameters);
        match cause {
            Some(cause) => builder.cause(cause).build(defaults),
            None => builder.build(defaults),
        }
    }

    /// Start building an issue of a given kind.
    pub fn builder(kind: impl Into<String>, message: impl Into<String>) -> IssueBuilder {
        IssueBuilder::new(kind, message)
    }

    /// Wrap a `std::error::Error` and its sources as a chain of issues.
    #[track_caller]
    pub fn from_error(defaults: &IssueDefaults, error: &(dyn Error + 'static)) -> Self {
        let mut messages = error_chain_messages(error).into_iter();
        let head = messages.next().unwrap_or_default();
        let builder = IssueBuilder::new(STD_ERROR_KIND, head);
        IssueBuilder {
            external: messages.collect(),
            ..builder
        }
        .build(defaults)
    }

    /// Kind name, such as `ers::CantOpenFile`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Human-readable message, fixed at construction.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Capture time.
    #[must_use]
    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Severity carried by the issue itself.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Return the issue with another severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Textual parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Look up one parameter.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Qualifiers, package first.
    #[must_use]
    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    /// Append a qualifier. Returns `false` when it was already present.
    pub fn add_qualifier(&mut self, qualifier: impl Into<String>) -> bool {
        let qualifier = qualifier.into();
        if self.qualifiers.contains(&qualifier) {
            return false;
        }
        self.qualifiers.push(qualifier);
        true
    }

    /// The issue that triggered this one.
    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        self.cause.as_deref()
    }

    /// Captured context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Walk this issue and its causes, newest first.
    #[must_use]
    pub const fn chain(&self) -> Chain<'_> {
        Chain::new(self)
    }

    /// Copy of this link alone, without its cause.
    fn shallow(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            message: self.message.clone(),
            time: self.time,
            severity: self.severity,
            parameters: self.parameters.clone(),
            qualifiers: self.qualifiers.clone(),
            cause: None,
            context: self.context.clone(),
        }
    }

    fn same_link(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.message == other.message
            && self.time == other.time
            && self.severity == other.severity
            && self.parameters == other.parameters
            && self.qualifiers == other.qualifiers
            && self.context == other.context
    }

    /// Substitute the call site of the context.
    #[must_use]
    pub fn with_call_site(mut self, site: CallSite) -> Self {
        let context = self.context.clone().with_call_site(site);
        self.context = context;
        self
    }
}

/// Read access shared by everything that can travel down a stream.
///
/// Implemented by [`Issue`], by kinds declared with
/// [`declare_issue!`](crate::declare_issue), and by the transport's wire
/// issue. Rendering and filtering only go through this trait.
pub trait Reportable {
    /// Kind name.
    fn kind(&self) -> &str;
    /// Human-readable message.
    fn message(&self) -> &str;
    /// Severity at dispatch time.
    fn severity(&self) -> Severity;
    /// Capture time.
    fn time(&self) -> DateTime<Utc>;
    /// Textual parameters.
    fn parameters(&self) -> &Parameters;
    /// Qualifiers, package first.
    fn qualifiers(&self) -> &[String];
    /// Call site.
    fn site(&self) -> &CallSite;
    /// Process half of the context.
    fn process(&self) -> &ProcessContext;
    /// Next link of the cause chain.
    fn cause(&self) -> Option<&dyn Reportable>;
    /// Links dropped between this one and [`Reportable::cause`] when the
    /// chain was truncated.
    fn omitted_causes(&self) -> usize {
        0
    }
}

impl Reportable for Issue {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn time(&self) -> DateTime<Utc> {
        self.time
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    fn site(&self) -> &CallSite {
        self.context.site()
    }

    fn process(&self) -> &ProcessContext {
        self.context.process()
    }

    fn cause(&self) -> Option<&dyn Reportable> {
        self.cause.as_deref().map(|cause| cause as &dyn Reportable)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl Error for Issue {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

impl Clone for Issue {
    fn clone(&self) -> Self {
        let causes: Vec<&Self> = self.chain().skip(1).collect();
        let cause = causes.into_iter().rev().fold(None, |cause, link| {
            let mut copy = link.shallow();
            copy.cause = cause;
            Some(Box::new(copy))
        });
        let mut head = self.shallow();
        head.cause = cause;
        head
    }
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.chain();
        let mut right = other.chain();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a.same_link(b) => {},
                _ => return false,
            }
        }
    }
}

impl Eq for Issue {}

/// One link printed without its cause.
struct LinkDebug<'a>(&'a Issue);

impl fmt::Debug for LinkDebug<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let issue = self.0;
        formatter
            .debug_struct("Issue")
            .field("kind", &issue.kind)
            .field("message", &issue.message)
            .field("time", &issue.time)
            .field("severity", &issue.severity)
            .field("parameters", &issue.parameters)
            .field("qualifiers", &issue.qualifiers)
            .field("context", &issue.context)
            .finish()
    }
}

struct CausesDebug<'a>(&'a Issue);

impl fmt::Debug for CausesDebug<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.0.chain().skip(1).map(LinkDebug))
            .finish()
    }
}

impl fmt::Debug for Issue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Issue")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("time", &self.time)
            .field("severity", &self.severity)
            .field("parameters", &self.parameters)
            .field("qualifiers", &self.qualifiers)
            .field("context", &self.context)
            .field("causes", &CausesDebug(self))
            .finish()
    }
}

impl Drop for Issue {
    fn drop(&mut self) {
        let mut next = self.cause.take();
        while let Some(mut issue) = next {
            next = issue.cause.take();
        }
    }
}

/// Builder for [`Issue`].
///
/// The context is captured exactly once, in [`IssueBuilder::build`].
#[derive(Debug, Clone)]
#[must_use]
pub struct IssueBuilder {
    kind: String,
    message: String,
    severity: Severity,
    parameters: Parameters,
    qualifiers: Vec<String>,
    cause: Option<Issue>,
    external: Vec<String>,
    site: Option<CallSite>,
    package: Option<String>,
}

impl IssueBuilder {
    /// Start a builder for the given kind and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            severity: Severity::default(),
            parameters: Parameters::new(),
            qualifiers: Vec::new(),
            cause: None,
            external: Vec::new(),
            site: None,
            package: None,
        }
    }

    /// Override the default severity.
    pub const fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add one parameter, coercing key and value to text.
    pub fn parameter(mut self, key: impl fmt::Display, value: impl fmt::Display) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    /// Add several parameters.
    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        self.parameters.extend(
            parameters
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );
        self
    }

    /// Add a qualifier after the package and configured defaults.
    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    /// Chain an earlier issue as the cause.
    pub fn cause(mut self, cause: impl Into<Issue>) -> Self {
        self.cause = Some(cause.into());
        self.external.clear();
        self
    }

    /// Chain an external error and its sources as the cause.
    pub fn cause_error(mut self, error: &(dyn Error + 'static)) -> Self {
        self.cause = None;
        self.external = error_chain_messages(error);
        self
    }

    /// Use an explicit call site instead of the caller's location.
    pub fn site(mut self, site: CallSite) -> Self {
        self.site = Some(site);
        self
    }

    /// Package recorded when the site comes from `#[track_caller]`.
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Capture the context and finish the issue.
    #[track_caller]
    pub fn build(self, defaults: &IssueDefaults) -> Issue {
        let site = match self.site {
            Some(site) => site,
            None => {
                let package = self
                    .package
                    .as_deref()
                    .unwrap_or_else(|| kind_package(&self.kind));
                CallSite::caller(package)
            },
        };
        let context = Context::capture(site, defaults);
        let time = Utc::now();

        let cause = match self.cause {
            Some(cause) => Some(Box::new(cause)),
            None => external_chain(self.external, &context, time, self.severity),
        };

        let mut qualifiers = Vec::with_capacity(1 + defaults.qualifiers().len());
        let seeds = std::iter::once(context.package_name().to_owned())
            .chain(defaults.qualifiers().iter().cloned())
            .chain(self.qualifiers);
        for qualifier in seeds {
            if !qualifier.is_empty() && !qualifiers.contains(&qualifier) {
                qualifiers.push(qualifier);
            }
        }

        Issue {
            kind: self.kind,
            message: self.message,
            time,
            severity: self.severity,
            parameters: self.parameters,
            qualifiers,
            cause,
            context,
        }
    }
}

/// Namespace portion of a kind name (`ers` for `ers::Message`).
fn kind_package(kind: &str) -> &str {
    kind.rsplit_once("::").map_or(kind, |(package, _)| package)
}

/// Turn flattened error messages into nested issues sharing one context.
fn external_chain(
    messages: Vec<String>,
    context: &Context,
    time: DateTime<Utc>,
    severity: Severity,
) -> Option<Box<Issue>> {
    messages.into_iter().rev().fold(None, |cause, message| {
        Some(Box::new(Issue {
            kind: STD_ERROR_KIND.to_owned(),
            message,
            time,
            severity,
            parameters: Parameters::new(),
            qualifiers: vec![context.package_name().to_owned()],
            cause,
            context: context.clone(),
        }))
    })
}
