//! Integration tests for parsing config fixtures from the workspace testkit.

use ers_config::{
    CURRENT_CONFIG_VERSION, ErsEnv, load_config_from_path, parse_ers_config_json,
    parse_ers_config_toml,
};
use ers_domain::Severity;
use ers_shared::ErrorCode;
use proptest::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

fn fixtures_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
        .join("crates")
        .join("testkit")
        .join("fixtures")
}

fn read_fixture(relative: &str) -> Result<String, Box<dyn Error>> {
    Ok(fs::read_to_string(fixtures_root().join(relative))?)
}

#[test]
fn parses_valid_json_fixture_and_normalizes() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/ers-config.valid.json")?;
    let config = parse_ers_config_json(&contents)?;

    assert_eq!(config.as_ref().version, CURRENT_CONFIG_VERSION);
    assert_eq!(config.verbosity_level(), 2);
    assert_eq!(config.debug_level(), 3);
    assert_eq!(
        config.application_name(),
        "readout-app",
        "application name should be trimmed"
    );
    assert_eq!(config.qualifiers(), ["daq", "readout"]);
    Ok(())
}

#[test]
fn parses_valid_toml_fixture() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/ers-config.valid.toml")?;
    let config = parse_ers_config_toml(&contents)?;

    assert_eq!(config.verbosity_level(), -1);
    assert_eq!(config.application_name(), "trigger");
    assert_eq!(config.issue_defaults().application_name(), "trigger");

    let warning: Vec<String> = config
        .stream_chain(Severity::Warning)
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(warning, ["throttle(10,60)", "filter(daq,!test)", "lstderr"]);
    assert_eq!(config.stream_chain(Severity::Fatal).len(), 2);
    assert_eq!(config.stream_chain(Severity::Log).len(), 1);
    Ok(())
}

#[test]
fn path_loader_detects_toml_by_extension() -> Result<(), Box<dyn Error>> {
    let path = fixtures_root().join("config/ers-config.valid.toml");
    let config = load_config_from_path(Some(&path), &ErsEnv::default())?;
    assert_eq!(config.qualifiers(), ["daq", "trigger"]);
    Ok(())
}

#[test]
fn out_of_range_fixture_is_rejected() -> Result<(), Box<dyn Error>> {
    let contents = read_fixture("config/ers-config.invalid-level.json")?;
    let error = parse_ers_config_json(&contents)
        .err()
        .ok_or_else(|| std::io::Error::other("expected range error"))?;

    assert_eq!(error.code, ErrorCode::new("config", "level_out_of_range"));
    assert_eq!(
        error.metadata.get("field").map(String::as_str),
        Some("verbosityLevel")
    );
    Ok(())
}

#[test]
fn unknown_toml_field_reports_path() -> Result<(), Box<dyn Error>> {
    let path = fixtures_root().join("config/ers-config.unknown-field.toml");
    let error = load_config_from_path(Some(&path), &ErsEnv::default())
        .err()
        .ok_or_else(|| std::io::Error::other("expected parse error"))?;

    assert_eq!(error.code, ErrorCode::new("config", "invalid_toml"));
    assert!(error.metadata.contains_key("path"));
    Ok(())
}

proptest! {
    #[test]
    fn verbosity_range_is_enforced(level in -40i32..40) {
        let input = format!(r#"{{ "verbosityLevel": {level} }}"#);
        let accepted = parse_ers_config_json(&input).is_ok();
        prop_assert_eq!(accepted, (-3..=16).contains(&level));
    }

    #[test]
    fn normalized_qualifiers_are_unique(raw in proptest::collection::vec("[a-c ]{0,3}", 0..12)) {
        let input = serde_json::json!({ "qualifiers": raw }).to_string();
        let config = parse_ers_config_json(&input)
            .map_err(|error| TestCaseError::fail(error.to_string()))?;
        let qualifiers = config.qualifiers();
        for (index, qualifier) in qualifiers.iter().enumerate() {
            prop_assert!(!qualifier.is_empty());
            prop_assert_eq!(qualifier.trim(), qualifier.as_str());
            prop_assert!(!qualifiers[index + 1..].contains(qualifier));
        }
    }
}
