#![warn(missing_docs)]
//! # gallery-guard-app binary
//!
//! Replays a JSON event script against in-memory collaborators and prints
//! the resulting effects and status.

use std::io::IsTerminal;
use std::process::ExitCode;

use gallery_guard_app::{
    AppError, PROTECTION_ENV_VAR, ReplayScript, app_version, protection_enabled_from_env,
    redact_sensitive, replay,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: gallery-guard-app [--version] <script.json>";

/// CLI entry point.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let script_path = match args.first().map(String::as_str) {
        Some("--version") => {
            println!("gallery-guard-app {}", app_version());
            return ExitCode::SUCCESS;
        }
        Some("--help" | "-h") | None => {
            println!("{USAGE}");
            println!(
                "protection_enabled={} ({PROTECTION_ENV_VAR})",
                protection_enabled_from_env()
            );
            return ExitCode::SUCCESS;
        }
        Some(path) => path.to_string(),
    };

    match run(&script_path) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error!("[app] replay failed: {}", redact_sensitive(&failure.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(script_path: &str) -> Result<String, AppError> {
    let raw = std::fs::read_to_string(script_path)?;
    let script: ReplayScript = serde_json::from_str(&raw)?;
    script.config.validate()?;
    let report = replay(&script, protection_enabled_from_env())?;
    Ok(serde_json::to_string_pretty(&report)?)
}
