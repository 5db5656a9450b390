//! End-to-end reporting of a wrapped file-open failure.

use ers::{
    AnyIssue, CantOpenFile, ErsConfig, ErsEnv, Ers, JsonStreamTransport, PermissionDenied,
    Reportable, Severity, StandardStreamTransport, declare_issue,
};
use ers_config::apply_env_overrides;
use ers_testkit::{MemorySink, RecordingTransport};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

declare_issue! {
    /// A readout link stopped answering.
    pub LinkTimeout("readout::LinkTimeout") {
        /// Link number.
        link: u32,
    } => "Link {} timed out", link;
}

fn open(ers: &Ers, path: &str) -> Result<(), CantOpenFile> {
    let denied = PermissionDenied::new(ers.defaults(), None);
    Err(CantOpenFile::new(ers.defaults(), path, 13, Some(denied.into())))
}

fn configured(transport: Arc<dyn ers::TransportPort>) -> Result<Ers, Box<dyn Error>> {
    let config = apply_env_overrides(ErsConfig::default(), &ErsEnv::default())?;
    Ok(Ers::from_config(&config, transport))
}

fn expected_parameters() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("error".to_owned(), "13".to_owned()),
        ("filename".to_owned(), "test.py".to_owned()),
    ])
}

#[test]
fn wrapped_failure_reaches_the_transport_intact() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::shared();
    let ers = configured(transport.clone())?;

    let Err(failure) = open(&ers, "test.py") else {
        return Err("open should fail".into());
    };
    ers.error(failure)?;

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let wire: &AnyIssue = &sent[0].issue;
    assert_eq!(sent[0].stream, Severity::Error);
    assert_eq!(wire.message(), "Can not open \"test.py\" file, error = 13");
    assert_eq!(wire.parameters(), &expected_parameters());
    assert_eq!(
        wire.cause().map(|cause| cause.message()),
        Some("Permission denied")
    );
    assert_eq!(wire.site().file(), file!());
    assert_eq!(wire.kind(), CantOpenFile::KIND);
    Ok(())
}

#[test]
fn wrapped_failure_renders_its_cause() -> Result<(), Box<dyn Error>> {
    let sink = Arc::new(MemorySink::new());
    let ers = configured(Arc::new(StandardStreamTransport::new(sink.clone(), 2, 0)))?;

    let Err(failure) = open(&ers, "test.py") else {
        return Err("open should fail".into());
    };
    ers.warning(failure)?;

    let lines = sink.take();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line.starts_with("warning: WARNING "));
    assert!(line.contains("'error=13' 'filename=test.py'"));
    assert!(line.contains("\n\twas caused by: ERROR "));
    assert!(line.contains("Permission denied"));
    Ok(())
}

#[test]
fn wrapped_failure_serializes_with_its_cause() -> Result<(), Box<dyn Error>> {
    let sink = Arc::new(MemorySink::new());
    let ers = configured(Arc::new(JsonStreamTransport::new(sink.clone(), 0)))?;

    let Err(failure) = open(&ers, "test.py") else {
        return Err("open should fail".into());
    };
    ers.fatal(failure)?;

    let lines = sink.take();
    let value: serde_json::Value = serde_json::from_str(&lines[0])?;
    let issue: AnyIssue = serde_json::from_value(value["issue"].clone())?;
    assert_eq!(value["stream"], "fatal");
    assert_eq!(issue.severity(), Severity::Fatal);
    assert_eq!(issue.parameters(), &expected_parameters());
    assert_eq!(issue.cause().map(|cause| cause.message()), Some("Permission denied"));
    Ok(())
}

#[test]
fn text_payloads_never_reach_the_transport() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::shared();
    let ers = configured(transport.clone())?;

    for result in [
        ers.warning("disk full"),
        ers.error("disk full"),
        ers.fatal("disk full"),
    ] {
        let Err(error) = result else {
            return Err("text payload was accepted".into());
        };
        assert!(error.is_precondition());
    }
    assert!(transport.is_empty());
    Ok(())
}

#[test]
fn declared_kinds_dispatch_without_conversion() -> Result<(), Box<dyn Error>> {
    let transport = RecordingTransport::shared();
    let ers = configured(transport.clone())?;

    let denied = PermissionDenied::new(ers.defaults(), None);
    ers.warning(LinkTimeout::new(ers.defaults(), 7u32, Some(denied.into())))?;
    ers.info(PermissionDenied::new(ers.defaults(), None))?;

    let sent = transport.sent();
    assert_eq!(transport.streams(), vec![Severity::Warning, Severity::Info]);
    assert_eq!(sent[0].issue.kind(), LinkTimeout::KIND);
    assert_eq!(sent[0].issue.message(), "Link 7 timed out");
    assert_eq!(sent[0].issue.parameters().get("link").map(String::as_str), Some("7"));
    assert_eq!(
        sent[0].issue.cause().map(|cause| cause.kind()),
        Some(PermissionDenied::KIND)
    );
    Ok(())
}
