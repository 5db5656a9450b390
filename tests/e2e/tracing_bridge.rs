//! `tracing` events routed through the issue layer.

use ers::{Ers, ErsConfig, ErsEnv, MESSAGE_KIND, Reportable, Severity};
use ers_config::apply_env_overrides;
use ers_testkit::RecordingTransport;
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;

fn service() -> Result<(Arc<RecordingTransport>, Ers), Box<dyn Error>> {
    let config = apply_env_overrides(
        ErsConfig {
            application_name: "traced".to_owned(),
            qualifiers: vec!["daq".to_owned()],
            ..ErsConfig::default()
        },
        &ErsEnv::default(),
    )?;
    let transport = RecordingTransport::shared();
    Ok((transport.clone(), Ers::from_config(&config, transport)))
}

#[test]
fn tracing_levels_map_onto_streams() -> Result<(), Box<dyn Error>> {
    let (transport, ers) = service()?;
    let subscriber = tracing_subscriber::registry().with(ers.tracing_layer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::trace!("trace");
        tracing::debug!("debug");
        tracing::info!("info");
        tracing::warn!("warn");
        tracing::error!("error");
    });

    assert_eq!(
        transport.streams(),
        vec![
            Severity::Debug,
            Severity::Debug,
            Severity::Info,
            Severity::Warning,
            Severity::Error,
        ]
    );
    Ok(())
}

#[test]
fn events_become_message_issues_at_the_event_site() -> Result<(), Box<dyn Error>> {
    let (transport, ers) = service()?;
    let subscriber = tracing_subscriber::registry().with(ers.tracing_layer());

    let line = tracing::subscriber::with_default(subscriber, || {
        let line = line!() + 1;
        tracing::warn!(target: "daq::readout", link = 4, "link {} flapping", 4);
        line
    });

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let issue = &sent[0].issue;
    assert_eq!(issue.kind(), MESSAGE_KIND);
    assert_eq!(issue.message(), "link 4 flapping");
    assert_eq!(issue.site().file(), file!());
    assert_eq!(issue.site().line(), line);
    assert_eq!(issue.parameters().get("link").map(String::as_str), Some("4"));
    assert_eq!(issue.process().application_name(), "traced");
    assert!(issue.qualifiers().iter().any(|qualifier| qualifier == "daq"));
    Ok(())
}

#[test]
fn engine_diagnostics_do_not_loop_back() -> Result<(), Box<dyn Error>> {
    let (transport, ers) = service()?;
    let subscriber = tracing_subscriber::registry().with(ers.tracing_layer());

    tracing::subscriber::with_default(subscriber, || -> Result<(), Box<dyn Error>> {
        tracing::warn!(target: "ers::internal", "engine diagnostic");
        // Suppressed debug dispatches are traced on the internal target.
        ers.debug_text(9, "too verbose")?;
        Ok(())
    })?;

    assert!(transport.is_empty());
    Ok(())
}
