//! Explicit logger-to-handler registry.
//!
//! Loggers are named with dotted paths; the root logger is `""`. A record
//! emitted on `a.b` reaches the handlers of `a.b`, then `a`, then the root.

use ers_domain::INTERNAL_LOG_TARGET;
use ers_ports::{LogHandler, LogRecord};
use ers_shared::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the root logger.
pub const ROOT_LOGGER: &str = "";

/// Identifier returned when a handler is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "handler-{}", self.0)
    }
}

/// How a handler is installed on a logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstallMode {
    /// Attach next to the existing handlers.
    #[default]
    Add,
    /// Detach every existing handler first.
    Replace,
}

type Attached = Vec<(HandlerId, Arc<dyn LogHandler>)>;

/// Handlers attached per logger.
#[derive(Default)]
pub struct HandlerRegistry {
    loggers: BTreeMap<String, Attached>,
    next_id: u64,
}

impl HandlerRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` to `logger` in the given mode.
    pub fn install(
        &mut self,
        logger: &str,
        handler: Arc<dyn LogHandler>,
        mode: InstallMode,
    ) -> HandlerId {
        match mode {
            InstallMode::Add => self.add_handler(logger, handler),
            InstallMode::Replace => self.replace_all_handlers(logger, handler),
        }
    }

    /// Attach `handler` next to the existing ones.
    pub fn add_handler(&mut self, logger: &str, handler: Arc<dyn LogHandler>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.loggers
            .entry(logger.to_owned())
            .or_default()
            .push((id, handler));
        id
    }

    /// Detach every handler of `logger`, then attach `handler`.
    pub fn replace_all_handlers(
        &mut self,
        logger: &str,
        handler: Arc<dyn LogHandler>,
    ) -> HandlerId {
        let detached = self.clear(logger);
        tracing::debug!(
            target: INTERNAL_LOG_TARGET,
            logger,
            detached,
            handler = handler.name(),
            "replacing logger handlers"
        );
        self.add_handler(logger, handler)
    }

    /// Detach one handler. Returns `false` when it was not attached.
    pub fn remove_handler(&mut self, logger: &str, id: HandlerId) -> bool {
        let Some(attached) = self.loggers.get_mut(logger) else {
            return false;
        };
        let before = attached.len();
        attached.retain(|(attached_id, _)| *attached_id != id);
        let removed = attached.len() != before;
        if attached.is_empty() {
            self.loggers.remove(logger);
        }
        removed
    }

    /// Detach every handler of `logger`, returning how many there were.
    pub fn clear(&mut self, logger: &str) -> usize {
        self.loggers.remove(logger).map_or(0, |attached| attached.len())
    }

    /// Number of handlers attached directly to `logger`.
    #[must_use]
    pub fn handler_count(&self, logger: &str) -> usize {
        self.loggers.get(logger).map_or(0, Vec::len)
    }

    /// Names of the loggers that have at least one handler.
    pub fn loggers(&self) -> impl Iterator<Item = &str> {
        self.loggers.keys().map(String::as_str)
    }

    /// Hand `record` to every handler on its logger and the logger's ancestors.
    ///
    /// Every handler is called even when an earlier one fails; the first
    /// failure is returned.
    pub fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut first_error = None;
        for logger in lineage(&record.logger) {
            let Some(attached) = self.loggers.get(logger) else {
                continue;
            };
            for (_, handler) in attached {
                if let Err(error) = handler.handle(record) {
                    first_error.get_or_insert(error);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = formatter.debug_map();
        for (logger, attached) in &self.loggers {
            let names: Vec<&str> = attached.iter().map(|(_, handler)| handler.name()).collect();
            map.entry(logger, &names);
        }
        map.finish()
    }
}

/// `a.b.c`, `a.b`, `a`, then the root.
fn lineage(logger: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(logger);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            Some(current.rsplit_once('.').map_or(ROOT_LOGGER, |(parent, _)| parent))
        };
        Some(current)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ers_domain::CallSite;
    use ers_ports::LogLevel;
    use ers_shared::{ErrorCode, ErrorEnvelope};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    impl LogHandler for Counting {
        fn handle(&self, _record: &LogRecord) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::internal(),
                    "handler failed",
                ));
            }
            Ok(())
        }
    }

    fn record(logger: &str) -> LogRecord {
        LogRecord::text(
            logger,
            LogLevel::Info,
            "hello",
            CallSite::new(logger, "registry.rs", 1, "emit()"),
        )
    }

    #[test]
    fn lineage_walks_up_to_the_root() {
        assert_eq!(lineage("a.b.c").collect::<Vec<_>>(), vec!["a.b.c", "a.b", "a", ""]);
        assert_eq!(lineage("").collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn replace_mode_leaves_exactly_one_handler() {
        let mut registry = HandlerRegistry::new();
        for _ in 0..3 {
            registry.add_handler("daq", Arc::new(Counting::default()));
        }
        assert_eq!(registry.handler_count("daq"), 3);

        registry.install("daq", Arc::new(Counting::default()), InstallMode::Replace);
        assert_eq!(registry.handler_count("daq"), 1);

        registry.install("daq", Arc::new(Counting::default()), InstallMode::Replace);
        assert_eq!(registry.handler_count("daq"), 1);
    }

    #[test]
    fn detaching_is_idempotent() {
        let mut registry = HandlerRegistry::new();
        let id = registry.add_handler("daq", Arc::new(Counting::default()));

        assert!(registry.remove_handler("daq", id));
        assert!(!registry.remove_handler("daq", id));
        assert!(!registry.remove_handler("unknown", id));
        assert_eq!(registry.clear("daq"), 0);
        assert_eq!(registry.loggers().count(), 0);
    }

    #[test]
    fn records_propagate_to_ancestors() -> Result<()> {
        let mut registry = HandlerRegistry::new();
        let root = Arc::new(Counting::default());
        let daq = Arc::new(Counting::default());
        let other = Arc::new(Counting::default());
        registry.add_handler(ROOT_LOGGER, root.clone());
        registry.add_handler("daq", daq.clone());
        registry.add_handler("trigger", other.clone());

        registry.emit(&record("daq.readout"))?;
        registry.emit(&record("daq"))?;

        assert_eq!(root.calls.load(Ordering::SeqCst), 2);
        assert_eq!(daq.calls.load(Ordering::SeqCst), 2);
        assert_eq!(other.calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn failing_handlers_do_not_stop_the_others() {
        let mut registry = HandlerRegistry::new();
        let failing = Arc::new(Counting {
            fail: true,
            ..Counting::default()
        });
        let healthy = Arc::new(Counting::default());
        registry.add_handler("daq", failing.clone());
        registry.add_handler("daq", healthy.clone());

        let result = registry.emit(&record("daq"));

        assert!(result.is_err());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }
}
