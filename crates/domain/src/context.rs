//! Call-site and process metadata captured once per issue.

use crate::site::CallSite;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Application name used when none is configured.
pub const DEFAULT_APPLICATION_NAME: &str = "Undefined";

/// Host and user names used when the operating system cannot provide them.
pub const UNKNOWN_NAME: &str = "unknown";

/// Immutable per-process inputs for every issue constructor.
///
/// Built once from configuration and passed by reference; nothing in the
/// domain reads the environment on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDefaults {
    application_name: String,
    qualifiers: Vec<String>,
}

impl IssueDefaults {
    /// Build defaults with an application name and extra qualifiers.
    pub fn new(application_name: impl Into<String>, qualifiers: Vec<String>) -> Self {
        Self {
            application_name: application_name.into(),
            qualifiers,
        }
    }

    /// Logical application name injected into every context.
    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Qualifiers appended to every issue after its package.
    #[must_use]
    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }
}

impl Default for IssueDefaults {
    fn default() -> Self {
        Self::new(DEFAULT_APPLICATION_NAME, Vec::new())
    }
}

/// Process and environment half of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessContext {
    host_name: String,
    cwd: String,
    process_id: u32,
    thread_id: i32,
    user_id: u32,
    user_name: String,
    application_name: String,
}

impl ProcessContext {
    /// Query the running process. Never fails; missing data falls back to
    /// documented defaults.
    pub fn capture(application_name: &str) -> Self {
        Self {
            host_name: host_name().to_owned(),
            cwd: current_dir(),
            process_id: std::process::id(),
            thread_id: reduce_thread_id(raw_thread_id()),
            user_id: user_id(),
            user_name: user_name().to_owned(),
            application_name: application_name.to_owned(),
        }
    }

    /// Build a process context from explicit values.
    pub fn from_parts(parts: ProcessParts) -> Self {
        Self {
            host_name: parts.host_name,
            cwd: parts.cwd,
            process_id: parts.process_id,
            thread_id: parts.thread_id,
            user_id: parts.user_id,
            user_name: parts.user_name,
            application_name: parts.application_name,
        }
    }

    /// Host name.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Working directory at capture time.
    #[must_use]
    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Process id.
    #[must_use]
    pub const fn process_id(&self) -> u32 {
        self.process_id
    }

    /// Thread id, already reduced into the signed 32-bit range.
    #[must_use]
    pub const fn thread_id(&self) -> i32 {
        self.thread_id
    }

    /// Numeric user id.
    #[must_use]
    pub const fn user_id(&self) -> u32 {
        self.user_id
    }

    /// User name.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Logical application name.
    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }
}

/// Explicit inputs for [`ProcessContext::from_parts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessParts {
    /// Host name.
    pub host_name: String,
    /// Working directory.
    pub cwd: String,
    /// Process id.
    pub process_id: u32,
    /// Thread id (signed 32-bit).
    pub thread_id: i32,
    /// Numeric user id.
    pub user_id: u32,
    /// User name.
    pub user_name: String,
    /// Logical application name.
    pub application_name: String,
}

/// Everything known about where and in which process an issue was raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    site: CallSite,
    process: ProcessContext,
}

impl Context {
    /// Capture the process half and pair it with a call site.
    pub fn capture(site: CallSite, defaults: &IssueDefaults) -> Self {
        Self {
            site,
            process: ProcessContext::capture(defaults.application_name()),
        }
    }

    /// Pair an already captured process context with a site.
    pub const fn from_parts(site: CallSite, process: ProcessContext) -> Self {
        Self { site, process }
    }

    /// Substitute the call site, keeping the process half.
    ///
    /// Used by the logging bridge, whose records carry the log statement's
    /// location rather than the bridge's own.
    #[must_use]
    pub fn with_call_site(mut self, site: CallSite) -> Self {
        self.site = site;
        self
    }

    /// Call-site half.
    #[must_use]
    pub const fn site(&self) -> &CallSite {
        &self.site
    }

    /// Process half.
    #[must_use]
    pub const fn process(&self) -> &ProcessContext {
        &self.process
    }

    /// Originating package or module.
    #[must_use]
    pub fn package_name(&self) -> &str {
        self.site.package()
    }

    /// Function signature of the call site.
    #[must_use]
    pub fn function_name(&self) -> &str {
        self.site.function()
    }

    /// Source file of the call site.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.site.file()
    }

    /// Source line of the call site.
    #[must_use]
    pub const fn line_number(&self) -> u32 {
        self.site.line()
    }
}

/// Fold a runtime thread id into `0..2^31`.
///
/// Ids above the range alias; the value is descriptive only.
#[must_use]
pub fn reduce_thread_id(raw: u64) -> i32 {
    i32::try_from(raw % (1 << 31)).unwrap_or_default()
}

fn host_name() -> &'static str {
    static HOST: OnceLock<String> = OnceLock::new();
    HOST.get_or_init(query_host_name)
}

fn user_name() -> &'static str {
    static USER: OnceLock<String> = OnceLock::new();
    USER.get_or_init(query_user_name)
}

fn current_dir() -> String {
    std::env::current_dir()
        .map(|path| path.display().to_string())
        .unwrap_or_default()
}

#[cfg(unix)]
fn query_host_name() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(error) => {
            tracing::warn!(target: crate::INTERNAL_LOG_TARGET, %error, "host name unavailable");
            UNKNOWN_NAME.to_owned()
        },
    }
}

#[cfg(not(unix))]
fn query_host_name() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| UNKNOWN_NAME.to_owned())
}

#[cfg(unix)]
fn user_id() -> u32 {
    nix::unistd::getuid().as_raw()
}

#[cfg(not(unix))]
const fn user_id() -> u32 {
    0
}

#[cfg(unix)]
fn query_user_name() -> String {
    match nix::unistd::User::from_uid(nix::unistd::getuid()) {
        Ok(Some(user)) => user.name,
        Ok(None) => user_from_env(),
        Err(error) => {
            tracing::warn!(target: crate::INTERNAL_LOG_TARGET, %error, "user lookup failed");
            user_from_env()
        },
    }
}

#[cfg(not(unix))]
fn query_user_name() -> String {
    user_from_env()
}

fn user_from_env() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| UNKNOWN_NAME.to_owned())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn raw_thread_id() -> u64 {
    u64::try_from(nix::unistd::gettid().as_raw()).unwrap_or_default()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn raw_thread_id() -> u64 {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT: AtomicU64 = AtomicU64::new(1);
    thread_local! {
        static ID: Cell<u64> = const { Cell::new(0) };
    }
    ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}
