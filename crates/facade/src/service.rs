//! The configured reporting service.

use ers_adapters::{CatcherGuard, CatchingTransport, IssueLayer, SeverityStreamsTransport};
use ers_app::{DispatchError, IssueHandler, StreamRouter, as_issue};
use ers_config::{ValidatedErsConfig, load_config_std_env};
use ers_domain::{Issue, IssueDefaults};
use ers_ports::{AnyIssue, Report, TransportPort};
use ers_shared::Result;
use std::path::Path;
use std::sync::Arc;

/// Router and issue defaults built from one configuration.
///
/// Cloning is cheap; clones share the transport.
#[derive(Debug, Clone)]
pub struct Ers {
    router: StreamRouter,
    catching: CatchingTransport,
    defaults: IssueDefaults,
}

impl Ers {
    /// Wire `config` and `transport` together.
    #[must_use]
    pub fn from_config(config: &ValidatedErsConfig, transport: Arc<dyn TransportPort>) -> Self {
        let catching = CatchingTransport::new(transport);
        Self {
            router: StreamRouter::new(Arc::new(catching.clone())),
            catching,
            defaults: config.issue_defaults(),
        }
    }

    /// Load configuration from `path` and the process environment, then
    /// report through the configured per-severity stream chains on stdout
    /// and stderr.
    ///
    /// Precedence: env > config file > defaults.
    pub fn from_std_env(path: Option<&Path>) -> Result<Self> {
        let config = load_config_std_env(path)?;
        let transport = SeverityStreamsTransport::from_config_std(&config);
        Ok(Self::from_config(&config, Arc::new(transport)))
    }

    /// Issue defaults for constructors.
    #[must_use]
    pub const fn defaults(&self) -> &IssueDefaults {
        &self.defaults
    }

    /// The underlying router.
    #[must_use]
    pub const fn router(&self) -> &StreamRouter {
        &self.router
    }

    /// Dispatch to the debug stream at `level`.
    pub fn debug(&self, level: u32, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.router.debug(level, report)
    }

    /// Dispatch to the log stream.
    pub fn log(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.router.log(report)
    }

    /// Dispatch to the info stream.
    pub fn info(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.router.info(report)
    }

    /// Dispatch to the warning stream.
    pub fn warning(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.router.warning(report)
    }

    /// Dispatch to the error stream.
    pub fn error(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.router.error(report)
    }

    /// Dispatch to the fatal stream.
    pub fn fatal(&self, report: impl Into<Report>) -> Result<(), DispatchError> {
        self.router.fatal(report)
    }

    /// Wrap `text` in a `Message` issue raised at the caller.
    #[track_caller]
    pub fn message(&self, text: impl Into<String>) -> Issue {
        as_issue(&self.defaults, text)
    }

    /// Send free text to the debug stream.
    #[track_caller]
    pub fn debug_text(&self, level: u32, text: impl Into<String>) -> Result<(), DispatchError> {
        let issue = self.message(text);
        self.router.debug(level, issue)
    }

    /// Send free text to the log stream.
    #[track_caller]
    pub fn log_text(&self, text: impl Into<String>) -> Result<(), DispatchError> {
        let issue = self.message(text);
        self.router.log(issue)
    }

    /// Send free text to the info stream.
    #[track_caller]
    pub fn info_text(&self, text: impl Into<String>) -> Result<(), DispatchError> {
        let issue = self.message(text);
        self.router.info(issue)
    }

    /// Divert every issue to `catcher` until the guard is dropped.
    ///
    /// Issues the catcher reports itself still reach the transport.
    pub fn set_issue_catcher(
        &self,
        catcher: impl Fn(&AnyIssue) + Send + Sync + 'static,
    ) -> Result<CatcherGuard> {
        self.catching.set_issue_catcher(catcher)
    }

    /// A log handler dispatching through this service.
    #[must_use]
    pub fn issue_handler(&self) -> IssueHandler {
        IssueHandler::new(self.router.clone(), self.defaults.clone())
    }

    /// A `tracing` layer dispatching through this service.
    #[must_use]
    pub fn tracing_layer(&self) -> IssueLayer {
        IssueLayer::new(Arc::new(self.issue_handler()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ers_config::{ErsConfig, ErsEnv, apply_env_overrides};
    use ers_domain::{MESSAGE_KIND, Reportable, Severity};
    use ers_testkit::RecordingTransport;

    fn service(debug_level: u32) -> Result<(Arc<RecordingTransport>, Ers)> {
        let config = apply_env_overrides(
            ErsConfig {
                application_name: "facade-test".to_owned(),
                qualifiers: vec!["daq".to_owned()],
                ..ErsConfig::default()
            },
            &ErsEnv::default(),
        )?;
        let transport = Arc::new(RecordingTransport::with_debug_level(debug_level));
        Ok((transport.clone(), Ers::from_config(&config, transport)))
    }

    #[test]
    fn text_conveniences_capture_the_caller() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let (transport, ers) = service(1)?;
        ers.debug_text(1, "tick")?;
        ers.debug_text(2, "suppressed")?;
        ers.log_text("logged")?;
        ers.info_text("noted")?;

        let sent = transport.sent();
        assert_eq!(
            transport.streams(),
            vec![Severity::Debug, Severity::Log, Severity::Info]
        );
        for entry in &sent {
            assert_eq!(entry.issue.kind(), MESSAGE_KIND);
            assert_eq!(entry.issue.site().file(), file!());
            assert_eq!(entry.issue.process().application_name(), "facade-test");
            assert!(entry.issue.qualifiers().iter().any(|q| q == "daq"));
        }
        Ok(())
    }

    #[test]
    fn catchers_intercept_dispatches_and_clones() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let (transport, ers) = service(0)?;
        let caught = Arc::new(std::sync::Mutex::new(Vec::new()));
        let guard = ers.set_issue_catcher({
            let caught = Arc::clone(&caught);
            move |issue: &AnyIssue| {
                caught
                    .lock()
                    .expect("caught lock")
                    .push(issue.severity());
            }
        })?;

        ers.clone().warning(ers.message("diverted"))?;
        drop(guard);
        ers.error(ers.message("delivered"))?;

        assert_eq!(*caught.lock().expect("caught lock"), vec![Severity::Warning]);
        assert_eq!(transport.streams(), vec![Severity::Error]);
        Ok(())
    }

    #[test]
    fn handlers_share_the_service_transport() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let (transport, ers) = service(0)?;
        let handler = ers.issue_handler();
        handler.route(&ers_ports::LogRecord::text(
            "daq",
            ers_ports::LogLevel::Error,
            "link lost",
            ers_domain::CallSite::new("daq", "daq.rs", 3, "poll()"),
        ))?;

        assert_eq!(transport.streams(), vec![Severity::Error]);
        Ok(())
    }
}
