use std::path::Path;

use domreplay_core::api::{self as core_api, AppConfig};
use serde_json::Value;

use crate::commands::cli::Args;
use crate::error::CliError;

/// Loads the config file (explicit path or the default lookup), then applies
/// environment and command-line overrides.
pub fn load_config(args: &Args) -> Result<AppConfig, CliError> {
    let mut cfg = match args.config.as_deref() {
        Some(path) => {
            let mut cfg = core_api::load_from_path(path)
                .map_err(|e| CliError::Config(e.to_string()))?;
            core_api::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())
                .map_err(|e| CliError::Config(e.to_string()))?;
            cfg
        }
        None => core_api::load_default().map_err(|e| CliError::Config(e.to_string()))?,
    };

    if let Some(speed) = args.speed {
        if speed <= 0.0 || !speed.is_finite() {
            return Err(CliError::Config(format!(
                "--speed must be a positive number, got {speed}"
            )));
        }
        cfg.player.speed = speed;
    }
    if args.show_debug {
        cfg.player.show_debug = true;
    }
    Ok(cfg)
}

/// Splits recording text into raw events: a JSON array, a single object, or
/// one JSON value per line. Packed events stay as strings for the unpacker.
pub fn split_raw(text: &str) -> Result<Vec<Value>, CliError> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Array(items)) => return Ok(items),
        Ok(single @ Value::Object(_)) => return Ok(vec![single]),
        _ => {}
    }

    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str::<Value>(line)
            .map_err(|e| CliError::Command(format!("line {}: invalid JSON: {e}", idx + 1)))?;
        out.push(value);
    }
    Ok(out)
}

pub fn read_recording(path: &Path) -> Result<Vec<Value>, CliError> {
    let text = std::fs::read_to_string(path)?;
    let raw = split_raw(&text)?;
    tracing::debug!(target: "domreplay", "read {} raw events from {}", raw.len(), path.display());
    Ok(raw)
}

/// Writes the final document to `path`, or stdout when unset.
pub fn write_html(html: &str, path: Option<&Path>) -> Result<(), CliError> {
    match path {
        Some(p) => std::fs::write(p, html)?,
        None => println!("{html}"),
    }
    Ok(())
}
