//! Print the effective reporting config (defaults + file + env overrides).
//!
//! Usage: `print_effective_config [path] [--toml]`

use ers_config::{load_config_std_env, to_pretty_json, to_pretty_toml};
use std::io;
use std::io::Write;
use std::path::PathBuf;

fn main() -> std::process::ExitCode {
    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            std::process::ExitCode::from(1)
        },
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut as_toml = false;
    let mut path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        if arg == "--toml" {
            as_toml = true;
        } else {
            path = Some(PathBuf::from(arg));
        }
    }

    let config = load_config_std_env(path.as_deref())?;
    let output = if as_toml {
        to_pretty_toml(config.as_ref())?
    } else {
        to_pretty_json(config.as_ref())?
    };

    let mut stdout = io::stdout();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(())
}
