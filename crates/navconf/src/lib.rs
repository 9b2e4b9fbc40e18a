//! Layered configuration loading for the MIDI navigator.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/midi-navigate/config.toml` (system)
//! 2. `~/.config/midi-navigate/config.toml` (user)
//! 3. `./navigate.toml` (local override, replaced by `--config` when given)
//! 4. Environment variables (`NAVIGATE_*`, `RUST_LOG`)
//!
//! Each file only overrides the keys it sets.
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! host = "127.0.0.1"
//! http_port = 8000
//!
//! [telemetry]
//! log_level = "debug"
//!
//! [analysis]
//! frame_rate = 10
//! context_sigma = 40.0
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use settings::{AnalysisConfig, BindConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete navigator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NavConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl NavConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load with `config_path` standing in for `./navigate.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        Self::load_layers(&files, |key| std::env::var(key).ok())
    }

    /// Apply `files` in order over the defaults, then env overrides from `env`.
    pub fn load_layers(
        files: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = NavConfig::default();

        for path in files {
            loader::apply_file(&mut config, path)?;
            sources.files.push(path.clone());
        }

        loader::apply_env_overrides(&mut config, &mut sources, env);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# MIDI Navigator Configuration\n\n");

        output.push_str("[bind]\n");
        output.push_str(&format!("host = \"{}\"\n", self.bind.host));
        output.push_str(&format!("http_port = {}\n", self.bind.http_port));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.telemetry.log_level
        ));

        output.push_str("\n[analysis]\n");
        output.push_str(&format!("frame_rate = {}\n", self.analysis.frame_rate));
        output.push_str(&format!(
            "context_sigma = {:?}\n",
            self.analysis.context_sigma
        ));
        output.push_str(&format!("output_step = {}\n", self.analysis.output_step));
        output.push_str(&format!(
            "smoothing_window = {}\n",
            self.analysis.smoothing_window
        ));
        output.push_str(&format!(
            "max_analysis_seconds = {:?}\n",
            self.analysis.max_analysis_seconds
        ));
        output.push_str(&format!(
            "max_upload_bytes = {}\n",
            self.analysis.max_upload_bytes
        ));

        output
    }
}
