//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, NavConfig};
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/midi-navigate/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("midi-navigate/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("navigate.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and apply the keys it sets onto `config`.
pub fn apply_file(config: &mut NavConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

fn parse_error(path: &Path, message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Overlay the keys present in `contents`; absent keys keep their current value.
fn apply_toml(config: &mut NavConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| parse_error(path, e.to_string()))?;

    if let Some(bind) = table.get("bind").and_then(|v| v.as_table()) {
        if let Some(v) = bind.get("host").and_then(|v| v.as_str()) {
            config.bind.host = v.to_string();
        }
        if let Some(v) = bind.get("http_port").and_then(|v| v.as_integer()) {
            config.bind.http_port = u16::try_from(v)
                .map_err(|_| parse_error(path, format!("bind.http_port out of range: {v}")))?;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    if let Some(analysis) = table.get("analysis").and_then(|v| v.as_table()) {
        if let Some(v) = analysis.get("frame_rate").and_then(|v| v.as_integer()) {
            config.analysis.frame_rate = positive(v, "analysis.frame_rate", path)? as u32;
        }
        if let Some(v) = analysis.get("context_sigma") {
            config.analysis.context_sigma = number(v, "analysis.context_sigma", path)?;
        }
        if let Some(v) = analysis.get("output_step").and_then(|v| v.as_integer()) {
            config.analysis.output_step = positive(v, "analysis.output_step", path)? as usize;
        }
        if let Some(v) = analysis.get("smoothing_window").and_then(|v| v.as_integer()) {
            config.analysis.smoothing_window =
                positive(v, "analysis.smoothing_window", path)? as usize;
        }
        if let Some(v) = analysis.get("max_analysis_seconds") {
            let seconds = number(v, "analysis.max_analysis_seconds", path)?;
            if !(seconds > 0.0) {
                return Err(parse_error(
                    path,
                    format!("analysis.max_analysis_seconds must be positive, got {seconds}"),
                ));
            }
            config.analysis.max_analysis_seconds = seconds;
        }
        if let Some(v) = analysis.get("max_upload_bytes").and_then(|v| v.as_integer()) {
            config.analysis.max_upload_bytes =
                positive(v, "analysis.max_upload_bytes", path)? as usize;
        }
    }

    Ok(())
}

/// Accept `40` as well as `40.0`.
fn number(value: &toml::Value, key: &str, path: &Path) -> Result<f64, ConfigError> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
        .ok_or_else(|| parse_error(path, format!("{key} must be a number")))
}

fn positive(value: i64, key: &str, path: &Path) -> Result<i64, ConfigError> {
    if value > 0 && value <= u32::MAX as i64 {
        Ok(value)
    } else {
        Err(parse_error(path, format!("{key} must be positive, got {value}")))
    }
}

/// Apply environment variable overrides to config.
///
/// `env` looks up a variable by name; pass `|k| std::env::var(k).ok()` for the
/// process environment. Unparseable numeric values are ignored.
pub fn apply_env_overrides(
    config: &mut NavConfig,
    sources: &mut ConfigSources,
    env: impl Fn(&str) -> Option<String>,
) {
    let mut record = |key: &str| sources.env_overrides.push(key.to_string());

    if let Some(v) = env("NAVIGATE_HOST") {
        config.bind.host = v;
        record("NAVIGATE_HOST");
    }
    if let Some(port) = env("NAVIGATE_HTTP_PORT").and_then(|v| v.parse().ok()) {
        config.bind.http_port = port;
        record("NAVIGATE_HTTP_PORT");
    }

    if let Some(v) = env("NAVIGATE_LOG_LEVEL") {
        config.telemetry.log_level = v;
        record("NAVIGATE_LOG_LEVEL");
    }
    // Also support RUST_LOG
    if let Some(v) = env("RUST_LOG") {
        config.telemetry.log_level = v;
        record("RUST_LOG");
    }

    if let Some(rate) = env("NAVIGATE_FRAME_RATE").and_then(|v| v.parse().ok()) {
        if rate > 0 {
            config.analysis.frame_rate = rate;
            record("NAVIGATE_FRAME_RATE");
        }
    }
    if let Some(sigma) = env("NAVIGATE_CONTEXT_SIGMA").and_then(|v| v.parse().ok()) {
        config.analysis.context_sigma = sigma;
        record("NAVIGATE_CONTEXT_SIGMA");
    }
    if let Some(window) = env("NAVIGATE_SMOOTHING_WINDOW").and_then(|v| v.parse().ok()) {
        if window > 0 {
            config.analysis.smoothing_window = window;
            record("NAVIGATE_SMOOTHING_WINDOW");
        }
    }
}
