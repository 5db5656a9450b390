//! Paths into the shared fixture directory.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Root of `crates/testkit/fixtures`.
pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Absolute path of a fixture, relative to the fixture root.
pub fn fixture_path(relative: &str) -> PathBuf {
    fixtures_root().join(relative)
}

/// Read a fixture as text.
pub fn read_fixture(relative: &str) -> io::Result<String> {
    std::fs::read_to_string(fixture_path(relative))
}

/// Read a JSON object fixture as an environment map.
pub fn read_env_fixture(relative: &str) -> io::Result<BTreeMap<String, String>> {
    let raw = read_fixture(relative)?;
    serde_json::from_str(&raw).map_err(io::Error::other)
}
