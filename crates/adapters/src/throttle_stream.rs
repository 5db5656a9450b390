//! Rate-limiting decorator.
//!
//! Issues are grouped by call site (`file:line`). The first
//! `initial_threshold` occurrences of a group pass through. After that,
//! repeats are counted and replaced by a summary notice: one when the count
//! reaches a threshold that grows tenfold each time, one when more than
//! `time_limit` has passed since the last report, and one when the group
//! goes quiet for `time_limit` and then recurs. A quiet group starts over.

use chrono::{DateTime, Local, Utc};
use ers_domain::{INTERNAL_LOG_TARGET, Reportable, Severity, TIME_FORMAT};
use ers_ports::{AnyIssue, TransportPort};
use ers_shared::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Occurrences passed through before throttling starts.
pub const DEFAULT_INITIAL_THRESHOLD: u32 = 30;
/// Seconds of quiet that reset a group.
pub const DEFAULT_TIME_LIMIT_SECS: i64 = 30;

const FIRST_SUPPRESSION_THRESHOLD: u64 = 10;

/// Throttling parameters, written `initial_threshold,time_limit_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleLimits {
    /// Occurrences passed through before throttling starts.
    pub initial_threshold: u32,
    /// Seconds of quiet that reset a group.
    pub time_limit_secs: i64,
}

impl Default for ThrottleLimits {
    fn default() -> Self {
        Self {
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
        }
    }
}

impl ThrottleLimits {
    /// Parse `30,30`, `30` or an empty argument. Unreadable values keep
    /// their defaults.
    #[must_use]
    pub fn parse(argument: &str) -> Self {
        let mut limits = Self::default();
        let mut values = argument.split(',').map(str::trim);
        if let Some(value) = values.next().filter(|value| !value.is_empty()) {
            match value.parse() {
                Ok(threshold) => limits.initial_threshold = threshold,
                Err(_) => tracing::warn!(
                    target: INTERNAL_LOG_TARGET,
                    value,
                    "ignoring unreadable throttle threshold"
                ),
            }
        }
        if let Some(value) = values.next().filter(|value| !value.is_empty()) {
            match value.parse() {
                Ok(seconds) => limits.time_limit_secs = seconds,
                Err(_) => tracing::warn!(
                    target: INTERNAL_LOG_TARGET,
                    value,
                    "ignoring unreadable throttle time limit"
                ),
            }
        }
        limits
    }
}

#[derive(Debug, Clone)]
struct GroupRecord {
    last_occurrence: i64,
    last_occurrence_at: Option<DateTime<Utc>>,
    last_report: i64,
    initial_count: u32,
    threshold: u64,
    suppressed: u64,
}

impl Default for GroupRecord {
    fn default() -> Self {
        Self {
            last_occurrence: 0,
            last_occurrence_at: None,
            last_report: 0,
            initial_count: 0,
            threshold: FIRST_SUPPRESSION_THRESHOLD,
            suppressed: 0,
        }
    }
}

impl GroupRecord {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn notice(&mut self, issue: &AnyIssue, now: i64) -> AnyIssue {
        let last = self
            .last_occurrence_at
            .map(|time| time.with_timezone(&Local).format(TIME_FORMAT).to_string())
            .unwrap_or_default();
        let message = format!(
            "{} -- {} similar messages suppressed, last occurrence was at {last}",
            Reportable::message(issue),
            self.suppressed
        );
        self.last_report = now;
        self.suppressed = 0;
        issue.clone().with_message(message)
    }
}

/// What to forward for one occurrence.
#[derive(Debug)]
enum Verdict {
    Forward,
    Notice(AnyIssue),
    Suppress,
}

/// Transport passing only a bounded rate of repeated issues.
pub struct ThrottleTransport {
    inner: Arc<dyn TransportPort>,
    limits: ThrottleLimits,
    groups: Mutex<HashMap<String, GroupRecord>>,
}

impl ThrottleTransport {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn TransportPort>, limits: ThrottleLimits) -> Self {
        Self {
            inner,
            limits,
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Active limits.
    #[must_use]
    pub const fn limits(&self) -> ThrottleLimits {
        self.limits
    }

    fn verdict(&self, issue: &AnyIssue) -> Verdict {
        let site = Reportable::site(issue);
        let key = format!("{}:{}", site.file(), site.line());
        let time = Reportable::time(issue);
        let now = time.timestamp();
        let limit = self.limits.time_limit_secs;

        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        let record = groups.entry(key).or_default();

        let mut verdict = None;
        if now - record.last_occurrence > limit {
            if record.suppressed > 0 {
                verdict = Some(Verdict::Notice(record.notice(issue, now)));
            }
            record.reset();
        }

        let verdict = if record.initial_count < self.limits.initial_threshold {
            record.initial_count += 1;
            record.last_report = now;
            verdict.unwrap_or(Verdict::Forward)
        } else if record.suppressed >= record.threshold {
            record.threshold = record.threshold.saturating_mul(10);
            Verdict::Notice(record.notice(issue, now))
        } else if now - record.last_report > limit {
            Verdict::Notice(record.notice(issue, now))
        } else {
            record.suppressed += 1;
            Verdict::Suppress
        };

        record.last_occurrence = now;
        record.last_occurrence_at = Some(time);
        verdict
    }

    fn forward(&self, severity: Severity, level: u32, issue: &AnyIssue) -> Result<()> {
        match self.verdict(issue) {
            Verdict::Forward => self.inner.send(severity, level, issue),
            Verdict::Notice(notice) => self.inner.send(severity, level, &notice),
            Verdict::Suppress => {
                tracing::trace!(
                    target: INTERNAL_LOG_TARGET,
                    stream = severity.stream_name(),
                    kind = Reportable::kind(issue),
                    "issue throttled"
                );
                Ok(())
            },
        }
    }
}

impl fmt::Debug for ThrottleTransport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ThrottleTransport")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl TransportPort for ThrottleTransport {
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use ers_domain::{CallSite, Issue, IssueDefaults};

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn record(&self, issue: &AnyIssue) -> Result<()> {
            self.messages
                .lock()
                .expect("recorder lock")
                .push(Reportable::message(issue).to_owned());
            Ok(())
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().expect("recorder lock").clone()
        }
    }

    impl TransportPort for Recorder {
        fn debug(&self, issue: &AnyIssue, _level: u32) -> Result<()> {
            self.record(issue)
        }
        fn log(&self, issue: &AnyIssue) -> Result<()> {
            self.record(issue)
        }
        fn info(&self, issue: &AnyIssue) -> Result<()> {
            self.record(issue)
        }
        fn warning(&self, issue: &AnyIssue) -> Result<()> {
            self.record(issue)
        }
        fn error(&self, issue: &AnyIssue) -> Result<()> {
            self.record(issue)
        }
        fn fatal(&self, issue: &AnyIssue) -> Result<()> {
            self.record(issue)
        }
        fn debug_level(&self) -> u32 {
            0
        }
    }

    fn at(line: u32, time: DateTime<Utc>) -> AnyIssue {
        let issue = Issue::builder("ers::Issue", "link lost")
            .site(CallSite::new("daq", "readout.rs", line, "poll()"))
            .build(&IssueDefaults::default());
        let wire = AnyIssue::from_reportable(&issue, Severity::Warning);
        let mut json = serde_json::to_value(&wire).expect("encode");
        json["time"] = serde_json::Value::String(time.to_rfc3339());
        serde_json::from_value(json).expect("decode")
    }

    fn throttle(initial: u32, seconds: i64) -> (Arc<Recorder>, ThrottleTransport) {
        let recorder = Arc::new(Recorder::default());
        let limits = ThrottleLimits {
            initial_threshold: initial,
            time_limit_secs: seconds,
        };
        (recorder.clone(), ThrottleTransport::new(recorder, limits))
    }

    #[test]
    fn limits_parse_with_defaults() {
        assert_eq!(ThrottleLimits::parse(""), ThrottleLimits::default());
        assert_eq!(
            ThrottleLimits::parse("5, 60"),
            ThrottleLimits {
                initial_threshold: 5,
                time_limit_secs: 60
            }
        );
        assert_eq!(ThrottleLimits::parse("x,7").initial_threshold, 30);
        assert_eq!(ThrottleLimits::parse("x,7").time_limit_secs, 7);
    }

    #[test]
    fn repeats_beyond_the_initial_burst_are_counted_then_summarized() -> Result<()> {
        let (recorder, throttle) = throttle(3, 30);
        let start = Utc::now();

        for _ in 0..3 + 10 {
            throttle.warning(&at(10, start))?;
        }
        assert_eq!(recorder.messages().len(), 3);

        throttle.warning(&at(10, start))?;
        let messages = recorder.messages();
        assert_eq!(messages.len(), 4);
        assert!(messages[3].starts_with("link lost -- 10 similar messages suppressed"));

        for _ in 0..10 {
            throttle.warning(&at(10, start))?;
        }
        assert_eq!(recorder.messages().len(), 4);
        Ok(())
    }

    #[test]
    fn groups_are_keyed_by_call_site() -> Result<()> {
        let (recorder, throttle) = throttle(1, 30);
        let start = Utc::now();

        throttle.error(&at(10, start))?;
        throttle.error(&at(10, start))?;
        throttle.error(&at(11, start))?;

        assert_eq!(recorder.messages().len(), 2);
        Ok(())
    }

    #[test]
    fn quiet_groups_report_suppressions_and_start_over() -> Result<()> {
        let (recorder, throttle) = throttle(1, 30);
        let start = Utc::now();

        throttle.info(&at(10, start))?;
        throttle.info(&at(10, start))?;
        throttle.info(&at(10, start))?;
        assert_eq!(recorder.messages().len(), 1);

        let later = start + TimeDelta::seconds(120);
        throttle.info(&at(10, later))?;
        throttle.info(&at(10, later))?;

        let messages = recorder.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].contains("-- 2 similar messages suppressed"));
        Ok(())
    }

    #[test]
    fn debug_level_comes_from_the_inner_transport() {
        let (_, throttle) = throttle(1, 1);
        assert_eq!(throttle.debug_level(), 0);
        assert_eq!(throttle.limits().initial_threshold, 1);
    }
}
