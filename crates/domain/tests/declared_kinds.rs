//! Integration coverage for kinds declared outside the domain crate.

use ers_domain::{
    CantOpenFile, Issue, IssueDefaults, PermissionDenied, Reportable, Severity, declare_issue,
    here, render,
};
use std::error::Error;

declare_issue! {
    /// A configuration file could not be parsed.
    pub BadConfig("app::BadConfig") {
        /// File that failed to parse.
        path: String,
        /// Line of the first error.
        line: u32,
    } => "Bad configuration in {} at line {}", path, line;
}

fn load(defaults: &IssueDefaults, path: &str) -> Result<(), BadConfig> {
    let denied = PermissionDenied::new(defaults, None);
    let open = CantOpenFile::new(defaults, path, 13, Some(denied.into()));
    Err(BadConfig::at(here!(path), defaults, path, 1u32, Some(open.into())))
}

#[test]
fn external_kinds_build_full_chains() -> Result<(), Box<dyn Error>> {
    let defaults = IssueDefaults::new("integration", vec!["config".to_owned()]);
    let Err(error) = load(&defaults, "ers.toml") else {
        return Err("load should fail".into());
    };

    assert_eq!(BadConfig::KIND, "app::BadConfig");
    assert_eq!(error.path(), "ers.toml");
    assert_eq!(*error.line(), 1);
    assert_eq!(error.to_string(), "Bad configuration in ers.toml at line 1");
    assert_eq!(
        Reportable::site(&error).function(),
        "load(path = \"ers.toml\")"
    );

    let issue: Issue = error.into();
    let kinds: Vec<&str> = issue.chain().map(Issue::kind).collect();
    assert_eq!(
        kinds,
        vec!["app::BadConfig", "ers::CantOpenFile", "ers::PermissionDenied"]
    );
    assert_eq!(issue.qualifiers(), ["declared_kinds", "config"]);
    Ok(())
}

#[test]
fn error_sources_follow_the_cause_chain() {
    let defaults = IssueDefaults::default();
    let denied = PermissionDenied::new(&defaults, None);
    let open = CantOpenFile::new(&defaults, "test.py", 13, Some(denied.into()));

    let source = open.source().map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("Permission denied"));
}

#[test]
fn rendering_walks_every_link() {
    let defaults = IssueDefaults::default();
    let denied = PermissionDenied::new(&defaults, None);
    let open = CantOpenFile::new(&defaults, "test.py", 13, Some(denied.into()))
        .into_issue()
        .with_severity(Severity::Warning);

    let rendered = render(&open, -2);
    assert_eq!(
        rendered,
        "WARNING Can not open \"test.py\" file, error = 13\n\twas caused by: ERROR Permission denied"
    );
}
