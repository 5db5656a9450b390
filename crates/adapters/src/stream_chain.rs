//! Per-severity stream chains.
//!
//! Every severity owns a chain built from its stream definition, head
//! first: `throttle(30,30),filter(daq),lstderr`. Decorators (`filter`,
//! `throttle`) guard everything after them. Output stages (`lstdout`,
//! `lstderr`) write and pass the issue on. `null` drops it.
//!
//! Unknown stream names are skipped with a warning. A chain where nothing
//! could be built falls back to the built-in definition of its severity.

use crate::filter_stream::{FilterTransport, QualifierFilter};
use crate::log_sink::{LogSink, StderrLogSink, StdoutLogSink};
use crate::standard_stream::StandardStreamTransport;
use crate::throttle_stream::{ThrottleLimits, ThrottleTransport};
use ers_config::{
    StreamSpec, ValidatedErsConfig, default_stream_definition, parse_stream_definition,
};
use ers_domain::{INTERNAL_LOG_TARGET, Severity};
use ers_ports::{AnyIssue, TransportPort};
use ers_shared::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Line sinks behind the `lstdout` and `lstderr` stages.
#[derive(Clone)]
pub struct StreamOutputs {
    stdout: Arc<dyn LogSink>,
    stderr: Arc<dyn LogSink>,
}

impl StreamOutputs {
    /// Use the given sinks for standard output and standard error.
    #[must_use]
    pub fn new(stdout: Arc<dyn LogSink>, stderr: Arc<dyn LogSink>) -> Self {
        Self { stdout, stderr }
    }
}

impl Default for StreamOutputs {
    fn default() -> Self {
        Self::new(Arc::new(StdoutLogSink), Arc::new(StderrLogSink))
    }
}

impl fmt::Debug for StreamOutputs {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("StreamOutputs").finish_non_exhaustive()
    }
}

/// End of every chain.
#[derive(Debug)]
struct Discard {
    debug_level: u32,
}

impl TransportPort for Discard {
    fn debug(&self, _issue: &AnyIssue, _level: u32) -> Result<()> {
        Ok(())
    }

    fn log(&self, _issue: &AnyIssue) -> Result<()> {
        Ok(())
    }

    fn info(&self, _issue: &AnyIssue) -> Result<()> {
        Ok(())
    }

    fn warning(&self, _issue: &AnyIssue) -> Result<()> {
        Ok(())
    }

    fn error(&self, _issue: &AnyIssue) -> Result<()> {
        Ok(())
    }

    fn fatal(&self, _issue: &AnyIssue) -> Result<()> {
        Ok(())
    }

    fn debug_level(&self) -> u32 {
        self.debug_level
    }
}

/// An output stage followed by the rest of the chain.
struct Tee {
    head: StandardStreamTransport,
    next: Arc<dyn TransportPort>,
}

impl Tee {
    fn forward(&self, severity: Severity, level: u32, issue: &AnyIssue) -> Result<()> {
        self.head.send(severity, level, issue)?;
        self.next.send(severity, level, issue)
    }
}

impl fmt::Debug for Tee {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Tee")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

impl TransportPort for Tee {
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
        self.head.debug_level()
    }
}

/// Rendering settings shared by the output stages of one chain.
#[derive(Debug, Clone)]
struct ChainSettings<'a> {
    outputs: &'a StreamOutputs,
    verbosity: i32,
    debug_level: u32,
}

impl ChainSettings<'_> {
    fn discard(&self) -> Arc<dyn TransportPort> {
        Arc::new(Discard {
            debug_level: self.debug_level,
        })
    }

    fn output(
        &self,
        sink: &Arc<dyn LogSink>,
        next: Arc<dyn TransportPort>,
    ) -> Arc<dyn TransportPort> {
        Arc::new(Tee {
            head: StandardStreamTransport::new(sink.clone(), self.verbosity, self.debug_level),
            next,
        })
    }

    /// One stage in front of `next`, or `None` for an unknown stream.
    fn stage(
        &self,
        spec: &StreamSpec,
        next: Arc<dyn TransportPort>,
    ) -> Option<Arc<dyn TransportPort>> {
        let argument = spec.argument().unwrap_or_default();
        let stage: Arc<dyn TransportPort> = match spec.name() {
            "lstdout" | "stdout" => self.output(&self.outputs.stdout, next),
            "lstderr" | "stderr" => self.output(&self.outputs.stderr, next),
            "filter" => Arc::new(FilterTransport::new(next, QualifierFilter::parse(argument))),
            "throttle" => Arc::new(ThrottleTransport::new(next, ThrottleLimits::parse(argument))),
            "null" => self.discard(),
            unknown => {
                tracing::warn!(
                    target: INTERNAL_LOG_TARGET,
                    stream = unknown,
                    "skipping unknown output stream"
                );
                return None;
            },
        };
        Some(stage)
    }

    fn build(&self, specs: &[StreamSpec]) -> Option<Arc<dyn TransportPort>> {
        specs.iter().rev().fold(None, |chain, spec| {
            let next = chain.clone().unwrap_or_else(|| self.discard());
            self.stage(spec, next).or(chain)
        })
    }
}

/// Build the chain for `specs`, head first.
///
/// Returns `None` when no element names a known stream.
#[must_use]
pub fn build_stream_chain(
    specs: &[StreamSpec],
    outputs: &StreamOutputs,
    verbosity: i32,
    debug_level: u32,
) -> Option<Arc<dyn TransportPort>> {
    ChainSettings {
        outputs,
        verbosity,
        debug_level,
    }
    .build(specs)
}

/// Transport sending each severity through its own chain.
#[derive(Clone)]
pub struct SeverityStreamsTransport {
    chains: BTreeMap<Severity, Arc<dyn TransportPort>>,
    debug_level: u32,
}

impl SeverityStreamsTransport {
    /// Build every configured chain over the given sinks.
    #[must_use]
    pub fn from_config(config: &ValidatedErsConfig, outputs: &StreamOutputs) -> Self {
        let settings = ChainSettings {
            outputs,
            verbosity: config.verbosity_level(),
            debug_level: config.debug_level(),
        };
        let chains = Severity::ALL
            .into_iter()
            .map(|severity| {
                let chain = settings
                    .build(config.stream_chain(severity))
                    .or_else(|| {
                        tracing::warn!(
                            target: INTERNAL_LOG_TARGET,
                            stream = severity.stream_name(),
                            "no usable output stream configured, using the default"
                        );
                        let fallback = parse_stream_definition(default_stream_definition(severity))
                            .unwrap_or_default();
                        settings.build(&fallback)
                    })
                    .unwrap_or_else(|| settings.discard());
                (severity, chain)
            })
            .collect();
        Self {
            chains,
            debug_level: config.debug_level(),
        }
    }

    /// Chains over the process's stdout and stderr.
    #[must_use]
    pub fn from_config_std(config: &ValidatedErsConfig) -> Self {
        Self::from_config(config, &StreamOutputs::default())
    }

    fn forward(&self, severity: Severity, level: u32, issue: &AnyIssue) -> Result<()> {
        match self.chains.get(&severity) {
            Some(chain) => chain.send(severity, level, issue),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for SeverityStreamsTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SeverityStreamsTransport")
            .field("debug_level", &self.debug_level)
            .finish_non_exhaustive()
    }
}

impl TransportPort for SeverityStreamsTransport {
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
        self.debug_level
    }
}
