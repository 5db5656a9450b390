//! Transport boundary contract and the wire form of an issue.
//!
//! The transport owns delivery, buffering, retries, and any cross-process
//! serialization. This module only fixes what crosses the boundary.

use chrono::{DateTime, Utc};
use ers_domain::{
    CallSite, CantOpenFile, Issue, MAX_CAUSE_DEPTH, Parameters, PermissionDenied, ProcessContext,
    ProcessParts, Reportable, Severity,
};
use ers_shared::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter;

/// Process half of a remote context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteProcessContext(ProcessContext);

impl RemoteProcessContext {
    /// Build from the values reported by another process.
    pub fn new(
        host_name: impl Into<String>,
        process_id: u32,
        thread_id: i32,
        cwd: impl Into<String>,
        user_id: u32,
        user_name: impl Into<String>,
        application_name: impl Into<String>,
    ) -> Self {
        Self(ProcessContext::from_parts(ProcessParts {
            host_name: host_name.into(),
            cwd: cwd.into(),
            process_id,
            thread_id,
            user_id,
            user_name: user_name.into(),
            application_name: application_name.into(),
        }))
    }

    /// Underlying process description.
    #[must_use]
    pub const fn process(&self) -> &ProcessContext {
        &self.0
    }
}

impl From<ProcessContext> for RemoteProcessContext {
    fn from(process: ProcessContext) -> Self {
        Self(process)
    }
}

/// Context of an issue raised in another process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteContext {
    #[serde(flatten)]
    site: CallSite,
    process: RemoteProcessContext,
}

impl RemoteContext {
    /// Build from a call site description and a remote process context.
    pub fn new(
        package: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        function: impl Into<String>,
        process: RemoteProcessContext,
    ) -> Self {
        Self {
            site: CallSite::new(package, file, line, function),
            process,
        }
    }

    /// Call site.
    #[must_use]
    pub const fn site(&self) -> &CallSite {
        &self.site
    }

    /// Process half.
    #[must_use]
    pub const fn process(&self) -> &RemoteProcessContext {
        &self.process
    }
}

/// Context of an issue raised in this process.
///
/// The process half is queried at construction; only the site is supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalContext {
    #[serde(flatten)]
    site: CallSite,
    process: RemoteProcessContext,
    debug: bool,
}

impl LocalContext {
    /// Build a local context. `application_name` doubles as the package.
    pub fn new(
        application_name: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        function: impl Into<String>,
        debug: bool,
    ) -> Self {
        let application_name = application_name.into();
        let process = ProcessContext::capture(&application_name);
        Self {
            site: CallSite::new(application_name, file, line, function),
            process: RemoteProcessContext(process),
            debug,
        }
    }

    /// Call site.
    #[must_use]
    pub const fn site(&self) -> &CallSite {
        &self.site
    }

    /// Whether the raiser asked for debug detail.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }
}

/// Either flavour of wire context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireContext {
    /// Raised in this process.
    Local(LocalContext),
    /// Raised elsewhere.
    Remote(RemoteContext),
}

impl WireContext {
    /// Call site.
    #[must_use]
    pub const fn site(&self) -> &CallSite {
        match self {
            Self::Local(context) => &context.site,
            Self::Remote(context) => &context.site,
        }
    }

    /// Process half.
    #[must_use]
    pub const fn process(&self) -> &ProcessContext {
        match self {
            Self::Local(context) => &context.process.0,
            Self::Remote(context) => &context.process.0,
        }
    }
}

impl From<LocalContext> for WireContext {
    fn from(context: LocalContext) -> Self {
        Self::Local(context)
    }
}

impl From<RemoteContext> for WireContext {
    fn from(context: RemoteContext) -> Self {
        Self::Remote(context)
    }
}

/// The unit of dispatch handed to a transport.
///
/// Stable and serializable. On the wire the cause chain is a flat
/// `causes` array, newest first, so nesting depth stays constant. A chain
/// longer than [`MAX_CAUSE_DEPTH`] causes keeps its newest causes and its
/// root; the link before the root records how many were dropped.
pub struct AnyIssue {
    kind: String,
    severity: Severity,
    time: DateTime<Utc>,
    message: String,
    context: WireContext,
    parameters: Parameters,
    qualifiers: Vec<String>,
    omitted_causes: usize,
    cause: Option<Box<AnyIssue>>,
}

impl AnyIssue {
    /// Build a wire issue from a kind name, a context, and a message.
    ///
    /// Severity starts at `ERROR`; the context's package seeds the
    /// qualifiers.
    pub fn new(
        kind: impl Into<String>,
        context: impl Into<WireContext>,
        message: impl Into<String>,
    ) -> Self {
        let context = context.into();
        let qualifiers = vec![context.site().package().to_owned()];
        Self {
            kind: kind.into(),
            severity: Severity::default(),
            time: Utc::now(),
            message: message.into(),
            context,
            parameters: Parameters::new(),
            qualifiers,
            omitted_causes: 0,
            cause: None,
        }
    }

    /// Convert any reportable issue, stamping the outer link with the
    /// severity of the stream it is sent to.
    ///
    /// Causes keep their own severities. At most [`MAX_CAUSE_DEPTH`] causes
    /// are carried; past that the root is kept and the dropped middle is
    /// counted on the link before it.
    pub fn from_reportable(issue: &dyn Reportable, severity: Severity) -> Self {
        let mut links: Vec<&dyn Reportable> =
            iter::successors(Some(issue), |link| link.cause()).collect();

        let causes = links.len().saturating_sub(1);
        let mut cut = None;
        if causes > MAX_CAUSE_DEPTH {
            if let Some(root) = links.last().copied() {
                links.truncate(MAX_CAUSE_DEPTH);
                links.push(root);
                cut = Some((MAX_CAUSE_DEPTH - 1, causes - MAX_CAUSE_DEPTH));
            }
        }
        let omitted_at = |index: usize| {
            cut.filter(|(at, _)| *at == index)
                .map_or(0, |(_, omitted)| omitted)
        };

        let cause = links
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(None, |cause, (index, link)| {
                let mut wire = Self::link(*link, link.severity(), cause);
                wire.omitted_causes = omitted_at(index);
                Some(Box::new(wire))
            });
        let mut head = Self::link(issue, severity, cause);
        head.omitted_causes = omitted_at(0);
        head
    }

    fn link(issue: &dyn Reportable, severity: Severity, cause: Option<Box<Self>>) -> Self {
        let site = issue.site();
        let context = RemoteContext::new(
            site.package(),
            site.file(),
            site.line(),
            site.function(),
            RemoteProcessContext(issue.process().clone()),
        );
        Self {
            kind: issue.kind().to_owned(),
            severity,
            time: issue.time(),
            message: issue.message().to_owned(),
            context: WireContext::Remote(context),
            parameters: issue.parameters().clone(),
            qualifiers: issue.qualifiers().to_vec(),
            omitted_causes: 0,
            cause,
        }
    }

    fn shallow(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            severity: self.severity,
            time: self.time,
            message: self.message.clone(),
            context: self.context.clone(),
            parameters: self.parameters.clone(),
            qualifiers: self.qualifiers.clone(),
            omitted_causes: self.omitted_causes,
            cause: None,
        }
    }

    fn same_link(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.severity == other.severity
            && self.time == other.time
            && self.message == other.message
            && self.context == other.context
            && self.parameters == other.parameters
            && self.qualifiers == other.qualifiers
            && self.omitted_causes == other.omitted_causes
    }

    /// Rebuild a chain from links ordered newest first.
    fn relink(links: Vec<Self>) -> Option<Self> {
        let mut links = links.into_iter().rev();
        let root = links.next()?;
        Some(links.fold(root, |cause, mut link| {
            link.cause = Some(Box::new(cause));
            link
        }))
    }

    /// Return the issue with another severity.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Return the issue with another message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add a textual parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl fmt::Display, value: impl fmt::Display) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    /// Add a qualifier, skipping duplicates.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        let qualifier = qualifier.into();
        if !self.qualifiers.contains(&qualifier) {
            self.qualifiers.push(qualifier);
        }
        self
    }

    /// Chain a cause.
    #[must_use]
    pub fn with_cause(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Wire context.
    #[must_use]
    pub const fn context(&self) -> &WireContext {
        &self.context
    }

    /// Next link of the chain.
    #[must_use]
    pub fn cause_issue(&self) -> Option<&Self> {
        self.cause.as_deref()
    }

    /// This issue and its causes, newest first.
    pub fn links(&self) -> impl Iterator<Item = &Self> {
        iter::successors(Some(self), |issue| issue.cause_issue())
    }
}

impl Reportable for AnyIssue {
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

    fn omitted_causes(&self) -> usize {
        self.omitted_causes
    }
}

impl Clone for AnyIssue {
    fn clone(&self) -> Self {
        Self::relink(self.links().map(Self::shallow).collect()).unwrap_or_else(|| self.shallow())
    }
}

impl PartialEq for AnyIssue {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.links();
        let mut right = other.links();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a.same_link(b) => {},
                _ => return false,
            }
        }
    }
}

impl Eq for AnyIssue {}

impl fmt::Debug for AnyIssue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let causes: Vec<WireLinkRef<'_>> = self.links().skip(1).map(WireLinkRef::of).collect();
        formatter
            .debug_struct("AnyIssue")
            .field("kind", &self.kind)
            .field("severity", &self.severity)
            .field("time", &self.time)
            .field("message", &self.message)
            .field("context", &self.context)
            .field("parameters", &self.parameters)
            .field("qualifiers", &self.qualifiers)
            .field("omitted_causes", &self.omitted_causes)
            .field("causes", &causes)
            .finish()
    }
}

/// One link of the wire form, borrowed for serialization.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireLinkRef<'a> {
    kind: &'a str,
    severity: Severity,
    time: DateTime<Utc>,
    message: &'a str,
    context: &'a WireContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a Parameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qualifiers: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    omitted_causes: Option<usize>,
}

impl<'a> WireLinkRef<'a> {
    fn of(issue: &'a AnyIssue) -> Self {
        Self {
            kind: &issue.kind,
            severity: issue.severity,
            time: issue.time,
            message: &issue.message,
            context: &issue.context,
            parameters: (!issue.parameters.is_empty()).then_some(&issue.parameters),
            qualifiers: (!issue.qualifiers.is_empty()).then_some(issue.qualifiers.as_slice()),
            omitted_causes: (issue.omitted_causes > 0).then_some(issue.omitted_causes),
        }
    }
}

#[derive(Serialize)]
struct WireChainRef<'a> {
    #[serde(flatten)]
    head: WireLinkRef<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    causes: Vec<WireLinkRef<'a>>,
}

/// One link of the wire form, owned for deserialization.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLink {
    kind: String,
    severity: Severity,
    time: DateTime<Utc>,
    message: String,
    context: WireContext,
    #[serde(default)]
    parameters: Parameters,
    #[serde(default)]
    qualifiers: Vec<String>,
    #[serde(default)]
    omitted_causes: usize,
}

impl From<WireLink> for AnyIssue {
    fn from(link: WireLink) -> Self {
        Self {
            kind: link.kind,
            severity: link.severity,
            time: link.time,
            message: link.message,
            context: link.context,
            parameters: link.parameters,
            qualifiers: link.qualifiers,
            omitted_causes: link.omitted_causes,
            cause: None,
        }
    }
}

#[derive(Deserialize)]
struct WireChain {
    #[serde(flatten)]
    head: WireLink,
    #[serde(default)]
    causes: Vec<WireLink>,
}

impl Serialize for AnyIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        WireChainRef {
            head: WireLinkRef::of(self),
            causes: self.links().skip(1).map(WireLinkRef::of).collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnyIssue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let WireChain { head, causes } = WireChain::deserialize(deserializer)?;
        let links = iter::once(head).chain(causes).map(Self::from).collect();
        Self::relink(links).ok_or_else(|| serde::de::Error::custom("wire issue has no links"))
    }
}

impl Drop for AnyIssue {
    fn drop(&mut self) {
        let mut next = self.cause.take();
        while let Some(mut issue) = next {
            next = issue.cause.take();
        }
    }
}

/// Payload handed to a stream.
///
/// Only the issue variants may be dispatched. `Text` exists so that callers
/// and logging records can carry free text up to the point where it is
/// either wrapped explicitly or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Issue raised in this process.
    Issue(Issue),
    /// Issue already in wire form.
    Remote(AnyIssue),
    /// Free text, not an issue.
    Text(String),
}

impl Report {
    /// Short description of the payload variant.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Issue(_) => "issue",
            Self::Remote(_) => "remote issue",
            Self::Text(_) => "text",
        }
    }

    /// Issue capability of the payload, if it has one.
    #[must_use]
    pub fn as_reportable(&self) -> Option<&dyn Reportable> {
        match self {
            Self::Issue(issue) => Some(issue),
            Self::Remote(issue) => Some(issue),
            Self::Text(_) => None,
        }
    }
}

impl From<Issue> for Report {
    fn from(issue: Issue) -> Self {
        Self::Issue(issue)
    }
}

impl From<PermissionDenied> for Report {
    fn from(kind: PermissionDenied) -> Self {
        Self::Issue(kind.into_issue())
    }
}

impl From<CantOpenFile> for Report {
    fn from(kind: CantOpenFile) -> Self {
        Self::Issue(kind.into_issue())
    }
}

impl From<AnyIssue> for Report {
    fn from(issue: AnyIssue) -> Self {
        Self::Remote(issue)
    }
}

impl From<String> for Report {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Report {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Boundary contract for the delivery collaborator.
///
/// One primitive per stream plus the debug threshold. Errors are the
/// transport's own and are surfaced to callers unchanged.
pub trait TransportPort: Send + Sync {
    /// Deliver to the debug stream at the given level.
    fn debug(&self, issue: &AnyIssue, level: u32) -> Result<()>;

    /// Deliver to the log stream.
    fn log(&self, issue: &AnyIssue) -> Result<()>;

    /// Deliver to the info stream.
    fn info(&self, issue: &AnyIssue) -> Result<()>;

    /// Deliver to the warning stream.
    fn warning(&self, issue: &AnyIssue) -> Result<()>;

    /// Deliver to the error stream.
    fn error(&self, issue: &AnyIssue) -> Result<()>;

    /// Deliver to the fatal stream.
    fn fatal(&self, issue: &AnyIssue) -> Result<()>;

    /// Highest debug level that is delivered.
    fn debug_level(&self) -> u32;

    /// Deliver to the stream selected by `severity`.
    fn send(&self, severity: Severity, level: u32, issue: &AnyIssue) -> Result<()> {
        match severity {
            Severity::Debug => self.debug(issue, level),
            Severity::Log => self.log(issue),
            Severity::Info => self.info(issue),
            Severity::Warning => self.warning(issue),
            Severity::Error => self.error(issue),
            Severity::Fatal => self.fatal(issue),
        }
    }
}
