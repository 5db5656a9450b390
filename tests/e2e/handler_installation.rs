//! Installing the issue handler into a logger registry.

use ers::{
    CallSite, Ers, ErsConfig, ErsEnv, HandlerRegistry, InstallMode, LogLevel, LogRecord,
    PermissionDenied, ROOT_LOGGER, Report, Reportable, Severity,
};
use ers_config::apply_env_overrides;
use ers_testkit::{RecordingHandler, RecordingTransport};
use std::error::Error;
use std::sync::Arc;

fn service() -> Result<(Arc<RecordingTransport>, Ers), Box<dyn Error>> {
    let config = apply_env_overrides(
        ErsConfig {
            application_name: "bridge".to_owned(),
            ..ErsConfig::default()
        },
        &ErsEnv::default(),
    )?;
    let transport = RecordingTransport::shared();
    Ok((transport.clone(), Ers::from_config(&config, transport)))
}

fn site() -> CallSite {
    CallSite::new("daq.readout", "readout.py", 17, "poll()")
}

#[test]
fn replace_mode_detaches_every_existing_handler() -> Result<(), Box<dyn Error>> {
    let (transport, ers) = service()?;
    let existing: Vec<Arc<RecordingHandler>> = (0..3)
        .map(|index| Arc::new(RecordingHandler::named(format!("existing-{index}"))))
        .collect();

    let mut registry = HandlerRegistry::new();
    for handler in &existing {
        registry.add_handler("daq", handler.clone());
    }
    assert_eq!(registry.handler_count("daq"), 3);

    registry.install("daq", Arc::new(ers.issue_handler()), InstallMode::Replace);
    assert_eq!(registry.handler_count("daq"), 1);

    registry.emit(&LogRecord::text("daq", LogLevel::Info, "started", site()))?;

    assert!(existing.iter().all(|handler| handler.calls() == 0));
    assert_eq!(transport.streams(), vec![Severity::Info]);
    Ok(())
}

#[test]
fn add_mode_keeps_existing_handlers() -> Result<(), Box<dyn Error>> {
    let (transport, ers) = service()?;
    let console = Arc::new(RecordingHandler::named("console"));

    let mut registry = HandlerRegistry::new();
    registry.add_handler(ROOT_LOGGER, console.clone());
    let id = registry.install(ROOT_LOGGER, Arc::new(ers.issue_handler()), InstallMode::Add);
    assert_eq!(registry.handler_count(ROOT_LOGGER), 2);

    registry.emit(&LogRecord::text("daq.readout", LogLevel::Critical, "crate lost", site()))?;
    assert_eq!(console.calls(), 1);
    assert_eq!(transport.streams(), vec![Severity::Fatal]);

    assert!(registry.remove_handler(ROOT_LOGGER, id));
    assert!(!registry.remove_handler(ROOT_LOGGER, id));
    registry.emit(&LogRecord::text("daq", LogLevel::Error, "ignored", site()))?;
    assert_eq!(console.calls(), 2);
    assert_eq!(transport.len(), 1);
    Ok(())
}

#[test]
fn bridged_records_keep_their_origin() -> Result<(), Box<dyn Error>> {
    let (transport, ers) = service()?;
    let mut registry = HandlerRegistry::new();
    registry.install(ROOT_LOGGER, Arc::new(ers.issue_handler()), InstallMode::Replace);

    registry.emit(
        &LogRecord::text("daq.readout", LogLevel::Warning, "link 4 flapping", site())
            .with_field("link", "4"),
    )?;
    let denied = PermissionDenied::new(ers.defaults(), None).into_issue();
    registry.emit(&LogRecord::new(
        "daq",
        LogLevel::Error,
        Report::Issue(denied.clone()),
        site(),
    ))?;

    let sent = transport.sent();
    let text = &sent[0].issue;
    assert_eq!(text.message(), "link 4 flapping");
    assert_eq!(text.site().file(), "readout.py");
    assert_eq!(text.site().line(), 17);
    assert_eq!(text.site().function(), "poll()");
    assert_eq!(text.parameters().get("link").map(String::as_str), Some("4"));
    assert_eq!(text.process().application_name(), "bridge");

    let forwarded = &sent[1].issue;
    assert_eq!(forwarded.message(), denied.message());
    assert_eq!(forwarded.site(), denied.context().site());
    Ok(())
}
