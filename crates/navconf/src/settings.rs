//! Configuration sections and their compiled defaults.

use serde::{Deserialize, Serialize};

/// Network bind address for the HTTP/WebSocket server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindConfig {
    /// Default: 0.0.0.0
    #[serde(default = "BindConfig::default_host")]
    pub host: String,

    /// Default: 8080
    #[serde(default = "BindConfig::default_http_port")]
    pub http_port: u16,
}

impl BindConfig {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_http_port() -> u16 {
        8080
    }

    /// `host:port`, ready for a TCP listener.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            http_port: Self::default_http_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Key-analysis tuning and upload limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Chroma frames per second.
    #[serde(default = "AnalysisConfig::default_frame_rate")]
    pub frame_rate: u32,

    /// Gaussian sigma, in frames, for the harmonic-context chroma.
    #[serde(default = "AnalysisConfig::default_context_sigma")]
    pub context_sigma: f64,

    /// Timeline stride, in frames.
    #[serde(default = "AnalysisConfig::default_output_step")]
    pub output_step: usize,

    /// Majority-vote window, in timeline entries.
    #[serde(default = "AnalysisConfig::default_smoothing_window")]
    pub smoothing_window: usize,

    /// Longest score, in seconds of pitched material, that gets key analysis.
    #[serde(default = "AnalysisConfig::default_max_analysis_seconds")]
    pub max_analysis_seconds: f64,

    /// Largest accepted upload body.
    #[serde(default = "AnalysisConfig::default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl AnalysisConfig {
    fn default_frame_rate() -> u32 {
        10
    }

    fn default_context_sigma() -> f64 {
        40.0
    }

    fn default_output_step() -> usize {
        5
    }

    fn default_smoothing_window() -> usize {
        5
    }

    fn default_max_analysis_seconds() -> f64 {
        7200.0
    }

    fn default_max_upload_bytes() -> usize {
        32 * 1024 * 1024
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_rate: Self::default_frame_rate(),
            context_sigma: Self::default_context_sigma(),
            output_step: Self::default_output_step(),
            smoothing_window: Self::default_smoothing_window(),
            max_analysis_seconds: Self::default_max_analysis_seconds(),
            max_upload_bytes: Self::default_max_upload_bytes(),
        }
    }
}
