//! Qualifier filter decorator.
//!
//! The filter expression is a list separated by commas or semicolons. Plain
//! items form the include list, items starting with `!` form the exclude list:
//! `daq,readout,!noisy`. An issue passes when it carries at least one
//! included qualifier (or the include list is empty) and none of the
//! excluded ones.

use ers_domain::{INTERNAL_LOG_TARGET, Reportable, Severity};
use ers_ports::{AnyIssue, TransportPort};
use ers_shared::Result;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Parsed include/exclude qualifier lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualifierFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl QualifierFilter {
    /// Parse a `q1,q2,!q3` or `q1;q2;!q3` expression. Blank items are ignored.
    #[must_use]
    pub fn parse(expression: &str) -> Self {
        let mut filter = Self::default();
        for item in expression.split([',', ';']).map(str::trim) {
            match item.strip_prefix('!').map(str::trim) {
                Some("") => {},
                Some(excluded) => push_unique(&mut filter.exclude, excluded),
                None if item.is_empty() => {},
                None => push_unique(&mut filter.include, item),
            }
        }
        filter
    }

    /// Included qualifiers.
    #[must_use]
    pub fn include(&self) -> &[String] {
        &self.include
    }

    /// Excluded qualifiers.
    #[must_use]
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Whether an issue with these qualifiers passes the filter.
    #[must_use]
    pub fn accepts(&self, qualifiers: &[String]) -> bool {
        let included = self.include.is_empty()
            || qualifiers
                .iter()
                .any(|qualifier| self.include.contains(qualifier));
        let excluded = qualifiers
            .iter()
            .any(|qualifier| self.exclude.contains(qualifier));
        included && !excluded
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_owned());
    }
}

impl FromStr for QualifierFilter {
    type Err = std::convert::Infallible;

    fn from_str(expression: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(expression))
    }
}

impl fmt::Display for QualifierFilter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self
            .include
            .iter()
            .cloned()
            .chain(self.exclude.iter().map(|item| format!("!{item}")))
            .collect::<Vec<_>>();
        formatter.write_str(&items.join(","))
    }
}

/// Transport forwarding only the issues accepted by a [`QualifierFilter`].
#[derive(Clone)]
pub struct FilterTransport {
    inner: Arc<dyn TransportPort>,
    filter: QualifierFilter,
}

impl FilterTransport {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn TransportPort>, filter: QualifierFilter) -> Self {
        Self { inner, filter }
    }

    /// Active filter.
    #[must_use]
    pub const fn filter(&self) -> &QualifierFilter {
        &self.filter
    }

    fn forward(&self, severity: Severity, level: u32, issue: &AnyIssue) -> Result<()> {
        if !self.filter.accepts(Reportable::qualifiers(issue)) {
            tracing::trace!(
                target: INTERNAL_LOG_TARGET,
                stream = severity.stream_name(),
                kind = Reportable::kind(issue),
                filter = %self.filter,
                "issue filtered out"
            );
            return Ok(());
        }
        self.inner.send(severity, level, issue)
    }
}

impl fmt::Debug for FilterTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FilterTransport")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl TransportPort for FilterTransport {
    fn debug(&self, issue: &AnyIssue, level: u32) -> Result<()> {
        self.forward(Severity::Debug, level, issue)
    }

    fn log(&self, issue: &AnyIssue) -> Result<()> {
        self.forward(Severity::Log, 0, issue)
    }

    fn info(&self, issue: &AnyIssue) -> Result<()> {
        self.forward(Severity::Info, 0, issue)
    }

    fn warning(&self, issue: &AnyIssue) -> Result<()> {
        self.forward(Severity::Warning, 0, issue)
    }

    fn error(&self, issue: &AnyIssue) -> Result<()> {
        self.forward(Severity::Error, 0, issue)
    }

    fn fatal(&self, issue: &AnyIssue) -> Result<()> {
        self.forward(Severity::Fatal, 0, issue)
    }

    fn debug_level(&self) -> u32 {
        self.inner.debug_level()
    }
}
