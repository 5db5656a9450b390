//! Issue catcher hook.
//!
//! While a catcher is installed, every issue sent through the transport is
//! handed to it instead of the output streams. Issues the catcher reports
//! itself go to the streams, so a catcher may use the same service.
//! Dropping the [`CatcherGuard`] removes the catcher.

use ers_domain::{INTERNAL_LOG_TARGET, Reportable, Severity};
use ers_ports::{AnyIssue, TransportPort};
use ers_shared::{ErrorCode, ErrorEnvelope, Result};
use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Callback receiving caught issues, stamped with their stream severity.
pub type IssueCatcher = Arc<dyn Fn(&AnyIssue) + Send + Sync>;

thread_local! {
    static IN_CATCHER: Cell<bool> = const { Cell::new(false) };
}

/// Resets the re-entry flag when the catcher returns or unwinds.
struct CatcherScope;

impl CatcherScope {
    fn enter() -> Self {
        IN_CATCHER.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for CatcherScope {
    fn drop(&mut self) {
        IN_CATCHER.with(|flag| flag.set(false));
    }
}

/// Transport diverting issues to an installed catcher.
#[derive(Clone)]
pub struct CatchingTransport {
    streams: Arc<dyn TransportPort>,
    catcher: Arc<RwLock<Option<IssueCatcher>>>,
}

impl CatchingTransport {
    /// Send to `streams` until a catcher is installed.
    #[must_use]
    pub fn new(streams: Arc<dyn TransportPort>) -> Self {
        Self {
            streams,
            catcher: Arc::new(RwLock::new(None)),
        }
    }

    /// Install `catcher`. Fails when one is already installed.
    pub fn set_issue_catcher(
        &self,
        catcher: impl Fn(&AnyIssue) + Send + Sync + 'static,
    ) -> Result<CatcherGuard> {
        let mut slot = self.catcher.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::new("catcher", "already_set"),
                "an issue catcher is already installed",
            ));
        }
        *slot = Some(Arc::new(catcher));
        Ok(CatcherGuard {
            catcher: Arc::clone(&self.catcher),
        })
    }

    /// Whether a catcher is installed.
    #[must_use]
    pub fn has_issue_catcher(&self) -> bool {
        self.catcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn forward(&self, severity: Severity, level: u32, issue: &AnyIssue) -> Result<()> {
        let catcher = if IN_CATCHER.with(Cell::get) {
            None
        } else {
            self.catcher
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        };
        let Some(catcher) = catcher else {
            return self.streams.send(severity, level, issue);
        };
        tracing::trace!(
            target: INTERNAL_LOG_TARGET,
            stream = severity.stream_name(),
            kind = Reportable::kind(issue),
            "issue caught"
        );
        let _scope = CatcherScope::enter();
        catcher(issue);
        Ok(())
    }
}

impl fmt::Debug for CatchingTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CatchingTransport")
            .field("catching", &self.has_issue_catcher())
            .finish_non_exhaustive()
    }
}

impl TransportPort for CatchingTransport {
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
        self.streams.debug_level()
    }
}

/// Keeps a catcher installed; dropping it removes the catcher.
#[must_use = "dropping the guard removes the catcher"]
pub struct CatcherGuard {
    catcher: Arc<RwLock<Option<IssueCatcher>>>,
}

impl fmt::Debug for CatcherGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CatcherGuard").finish_non_exhaustive()
    }
}

impl Drop for CatcherGuard {
    fn drop(&mut self) {
        *self.catcher.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
