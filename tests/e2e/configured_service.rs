//! Services built from config files and environment overrides.

use ers::{
    CantOpenFile, ErrorCode, ErrorKind, Ers, ErsEnv, Reportable, SeverityStreamsTransport,
    StandardStreamTransport, StreamOutputs, load_config_from_path,
};
use ers_config::EnvParseError;
use ers_testkit::fixtures::{fixture_path, read_env_fixture};
use ers_testkit::{MemorySink, RecordingTransport};
use std::error::Error;
use std::sync::Arc;

#[test]
fn env_overrides_win_over_the_config_file() -> Result<(), Box<dyn Error>> {
    let env = ErsEnv::from_map(&read_env_fixture("env/ers-env.valid.json")?)?;
    let config = load_config_from_path(Some(&fixture_path("config/ers-config.valid.toml")), &env)?;

    assert_eq!(config.verbosity_level(), 1);
    assert_eq!(config.debug_level(), 5);
    assert_eq!(config.application_name(), "dataflow");
    assert_eq!(config.qualifiers(), ["daq", "dataflow"]);

    let transport = Arc::new(RecordingTransport::with_debug_level(config.debug_level()));
    let ers = Ers::from_config(&config, transport.clone());
    ers.error(CantOpenFile::new(ers.defaults(), "run.cfg", 2, None))?;

    let issue = &transport.sent()[0].issue;
    assert_eq!(issue.process().application_name(), "dataflow");
    assert_eq!(issue.qualifiers()[1..], ["daq", "dataflow"]);
    Ok(())
}

#[test]
fn configured_debug_level_gates_the_debug_stream() -> Result<(), Box<dyn Error>> {
    let config = load_config_from_path(
        Some(&fixture_path("config/ers-config.valid.json")),
        &ErsEnv::default(),
    )?;
    assert_eq!(config.debug_level(), 3);

    let sink = Arc::new(MemorySink::new());
    let transport = StandardStreamTransport::from_config(&config, sink.clone());
    let ers = Ers::from_config(&config, Arc::new(transport));

    for level in 0..=5 {
        ers.debug_text(level, format!("pass {level}"))?;
    }

    let lines = sink.take();
    assert_eq!(lines.len(), 4);
    assert!(lines[3].starts_with("debug[3]: DEBUG "));
    assert!(lines[3].contains("Qualifiers = "));
    assert!(lines.iter().all(|line| line.contains("'readout' ")));
    Ok(())
}

#[test]
fn configured_stream_chains_pick_the_output_per_severity() -> Result<(), Box<dyn Error>> {
    let config = load_config_from_path(
        Some(&fixture_path("config/ers-config.valid.toml")),
        &ErsEnv::default(),
    )?;
    let stdout = Arc::new(MemorySink::new());
    let stderr = Arc::new(MemorySink::new());
    let outputs = StreamOutputs::new(stdout.clone(), stderr.clone());
    let ers = Ers::from_config(
        &config,
        Arc::new(SeverityStreamsTransport::from_config(&config, &outputs)),
    );

    ers.warning(CantOpenFile::new(ers.defaults(), "run.cfg", 2, None))?;
    ers.info_text("run started")?;
    ers.fatal(CantOpenFile::new(ers.defaults(), "run.cfg", 3, None))?;

    let stdout = stdout.take();
    let stderr = stderr.take();
    assert_eq!(stderr.len(), 2);
    assert!(stderr[0].starts_with("warning: "));
    assert!(stderr[1].starts_with("fatal: "));
    assert_eq!(stdout.len(), 2);
    assert!(stdout[0].starts_with("info: "));
    assert!(stdout[1].starts_with("fatal: "));
    Ok(())
}

#[test]
fn malformed_environment_is_rejected() -> Result<(), Box<dyn Error>> {
    let map = read_env_fixture("env/ers-env.invalid.json")?;
    let Err(error) = ErsEnv::from_map(&map) else {
        return Err("invalid debug level was accepted".into());
    };
    assert!(matches!(error, EnvParseError::InvalidInt { .. }));
    Ok(())
}

#[test]
fn invalid_files_report_their_path() -> Result<(), Box<dyn Error>> {
    let path = fixture_path("config/ers-config.unknown-field.toml");
    let Err(error) = load_config_from_path(Some(&path), &ErsEnv::default()) else {
        return Err("unknown field was accepted".into());
    };
    assert_eq!(error.code, ErrorCode::new("config", "invalid_toml"));
    assert!(error.metadata.contains_key("path"));

    let Err(error) = load_config_from_path(
        Some(&fixture_path("config/ers-config.invalid-level.json")),
        &ErsEnv::default(),
    ) else {
        return Err("out-of-range level was accepted".into());
    };
    assert_eq!(error.code, ErrorCode::new("config", "level_out_of_range"));
    assert_eq!(error.kind, ErrorKind::Expected);
    Ok(())
}
