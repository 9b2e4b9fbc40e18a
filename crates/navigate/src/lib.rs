//! navigate - transport layer for the music-theory engine
//!
//! - `api`: axum routes for chord naming and score upload
//! - `relay`: WebSocket fan-out of live note events
//! - `serve`: HTTP server lifecycle
//! - `commands`: one-shot CLI analyses

pub mod api;
pub mod commands;
pub mod relay;
pub mod serve;

use navconf::AnalysisConfig;
use theory_engine::KeyAnalysisParams;

/// Key-analysis tuning from the `[analysis]` config section.
pub fn key_params(config: &AnalysisConfig) -> KeyAnalysisParams {
    KeyAnalysisParams {
        frame_rate: config.frame_rate as f64,
        context_sigma: config.context_sigma,
        output_step: config.output_step,
        smoothing_window: config.smoothing_window,
        max_analysis_seconds: config.max_analysis_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_params_carry_every_analysis_setting() {
        let config = AnalysisConfig {
            frame_rate: 20,
            context_sigma: 12.5,
            output_step: 2,
            smoothing_window: 7,
            max_analysis_seconds: 30.0,
            ..AnalysisConfig::default()
        };
        let params = key_params(&config);

        assert_eq!(params.frame_rate, 20.0);
        assert_eq!(params.context_sigma, 12.5);
        assert_eq!(params.output_step, 2);
        assert_eq!(params.smoothing_window, 7);
        assert_eq!(params.max_frames(), 600);
    }
}
