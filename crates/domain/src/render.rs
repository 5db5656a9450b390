//! Human-readable rendering of issues and their cause chains.

use crate::cause::MAX_CAUSE_DEPTH;
use crate::issue::Reportable;
use crate::site::{ARGUMENTS_PLACEHOLDER, CallSite};
use chrono::Local;
use std::fmt::Write as _;

const FIELD_SEPARATOR: &str = "\n\t";

/// Timestamp layout used in rendered output.
pub const TIME_FORMAT: &str = "%Y-%b-%d %H:%M:%S";

/// Render an issue and its causes at the given verbosity.
///
/// | verbosity | adds |
/// |---|---|
/// | `> -3` | severity |
/// | `> -2` | local time |
/// | `> -1` | `[function at file:line]` |
/// | `> 1` | parameters and qualifiers |
/// | `> 2` | host, user, process and thread ids, working directory |
///
/// Each cause follows on its own line as `was caused by: ...`, rendered at
/// the same verbosity. At most [`MAX_CAUSE_DEPTH`] causes are written; the
/// rest are counted. Links already dropped from a truncated chain show up
/// as `was caused by: ... (N causes omitted)`.
pub fn render(issue: &dyn Reportable, verbosity: i32) -> String {
    let mut out = String::new();
    render_one(&mut out, issue, verbosity);
    render_omitted(&mut out, issue);

    let mut depth = 0usize;
    let mut next = issue.cause();
    while let Some(cause) = next {
        if depth == MAX_CAUSE_DEPTH {
            let remaining = remaining_links(cause);
            let _ = write!(
                out,
                "{FIELD_SEPARATOR}was caused by: ... ({remaining} more causes)"
            );
            break;
        }
        out.push_str(FIELD_SEPARATOR);
        out.push_str("was caused by: ");
        render_one(&mut out, cause, verbosity);
        render_omitted(&mut out, cause);
        depth += 1;
        next = cause.cause();
    }
    out
}

/// `function at file:line`, with arguments collapsed at verbosity 0.
pub fn position(site: &CallSite, verbosity: i32) -> String {
    let function = site.function();
    let function = if verbosity <= 0 {
        collapse_arguments(function)
    } else {
        function.to_owned()
    };
    format!("{function} at {}:{}", site.file(), site.line())
}

fn collapse_arguments(function: &str) -> String {
    match function.split_once('(') {
        Some((name, _)) => format!("{name}{ARGUMENTS_PLACEHOLDER}"),
        None => function.to_owned(),
    }
}

fn render_one(out: &mut String, issue: &dyn Reportable, verbosity: i32) {
    if verbosity > -3 {
        let _ = write!(out, "{} ", issue.severity());
    }
    if verbosity > -2 {
        let time = issue.time().with_timezone(&Local);
        let _ = write!(out, "{} ", time.format(TIME_FORMAT));
    }
    if verbosity > -1 {
        let _ = write!(out, "[{}] ", position(issue.site(), verbosity));
    }
    out.push_str(issue.message());

    if verbosity > 1 {
        out.push_str(FIELD_SEPARATOR);
        out.push_str("Parameters = ");
        for (key, value) in issue.parameters() {
            let _ = write!(out, "'{key}={value}' ");
        }
        out.push_str(FIELD_SEPARATOR);
        out.push_str("Qualifiers = ");
        for qualifier in issue.qualifiers() {
            let _ = write!(out, "'{qualifier}' ");
        }
    }
    if verbosity > 2 {
        let process = issue.process();
        let _ = write!(
            out,
            "{FIELD_SEPARATOR}host = {}\
             {FIELD_SEPARATOR}user = {} ({})\
             {FIELD_SEPARATOR}process id = {}\
             {FIELD_SEPARATOR}thread id = {}\
             {FIELD_SEPARATOR}process wd = {}",
            process.host_name(),
            process.user_name(),
            process.user_id(),
            process.process_id(),
            process.thread_id(),
            process.cwd(),
        );
    }
}

fn render_omitted(out: &mut String, link: &dyn Reportable) {
    let omitted = link.omitted_causes();
    if omitted > 0 {
        let _ = write!(
            out,
            "{FIELD_SEPARATOR}was caused by: ... ({omitted} causes omitted)"
        );
    }
}

fn remaining_links(from: &dyn Reportable) -> usize {
    let mut count = 0usize;
    let mut next = Some(from);
    while let Some(link) = next {
        count += 1;
        next = link.cause();
    }
    count
}
