use midi_analysis::{
    compute_chroma, gaussian_smooth, parse_score, ChromaMatrix, MeterEntry, ParsedScore,
    TempoEntry, TempoMap, TrackFilter, TrackInfo,
};
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::aggregate::aggregate;
use crate::chords::panic_message;
use crate::key::score_frame;
use crate::profiles::candidates;
use crate::timeline::{smooth_timeline, DEFAULT_WINDOW};
use crate::types::{KeyTimeline, UNKNOWN_KEY};

pub const DEFAULT_TIME_SIGNATURE: &str = "4/4";
pub const DEFAULT_BPM: u32 = 120;

/// Initial tempos at or below this are treated as unreliable.
const MIN_PLAUSIBLE_BPM: f64 = 30.0;

/// Two hours.
pub const DEFAULT_MAX_ANALYSIS_SECONDS: f64 = 7200.0;

/// Tuning for the key-timeline pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAnalysisParams {
    /// Chroma frames per second.
    pub frame_rate: f64,
    /// Gaussian sigma, in frames, for the harmonic-context chroma.
    pub context_sigma: f64,
    /// Emit one timeline entry every this many frames.
    pub output_step: usize,
    /// Majority-vote window, in timeline entries.
    pub smoothing_window: usize,
    /// Scores whose pitched material runs past this are not key-analyzed.
    pub max_analysis_seconds: f64,
}

impl Default for KeyAnalysisParams {
    fn default() -> Self {
        Self {
            frame_rate: 10.0,
            context_sigma: 40.0,
            output_step: 5,
            smoothing_window: DEFAULT_WINDOW,
            max_analysis_seconds: DEFAULT_MAX_ANALYSIS_SECONDS,
        }
    }
}

impl KeyAnalysisParams {
    /// Chroma frame ceiling implied by `max_analysis_seconds`.
    pub fn max_frames(&self) -> usize {
        (self.max_analysis_seconds * self.frame_rate).ceil().max(0.0) as usize
    }
}

/// Global key plus the smoothed, respelled timeline it was voted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAnalysis {
    pub key: String,
    pub key_timeline: KeyTimeline,
}

impl KeyAnalysis {
    pub fn unknown() -> Self {
        Self {
            key: UNKNOWN_KEY.to_string(),
            key_timeline: Vec::new(),
        }
    }
}

/// Per-request analysis choices supplied by the client.
///
/// `complexity` and `window_size` are carried through to the report for
/// client compatibility; the analysis itself does not depend on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// Tracks to analyze; `None` means every pitched track.
    pub track_selection: Option<Vec<usize>>,
    pub complexity: String,
    /// Seconds.
    pub window_size: f64,
}

impl Default for ScoreRequest {
    fn default() -> Self {
        Self {
            track_selection: None,
            complexity: "standard".to_string(),
            window_size: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub track_count: usize,
    pub duration_seconds: f64,
}

/// Everything a file analysis reports: key timeline merged with score metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub key: String,
    pub time_signature: String,
    /// Declared tempo at the start of the file, not an onset-based estimate.
    pub bpm: u32,
    pub key_timeline: KeyTimeline,
    pub tempo_map: Vec<TempoEntry>,
    pub meter_map: Vec<MeterEntry>,
    pub track_metadata: Vec<TrackInfo>,
    pub basic_stats: BasicStats,
    pub complexity: String,
    pub window_size: f64,
}

/// Score → smooth → aggregate over a raw chroma matrix.
///
/// The matrix is Gaussian-smoothed first so each frame carries its harmonic
/// context; every `output_step`-th frame is scored.
pub fn analyze_chroma(chroma: &ChromaMatrix, params: &KeyAnalysisParams) -> KeyAnalysis {
    info!(frames = chroma.len(), "starting key analysis");

    let context = gaussian_smooth(chroma, params.context_sigma);
    let table = candidates();

    let raw: KeyTimeline = context
        .frames()
        .iter()
        .enumerate()
        .step_by(params.output_step.max(1))
        .map(|(i, frame)| score_frame(i as f64 / params.frame_rate, frame, table))
        .collect();

    let smoothed = smooth_timeline(&raw, params.smoothing_window);
    let global = aggregate(smoothed);

    info!(
        key = %global.name,
        entries = global.timeline.len(),
        "key analysis complete"
    );

    KeyAnalysis {
        key: global.name,
        key_timeline: global.timeline,
    }
}

/// Pitched tracks the request asked for, in file order.
fn selected_tracks(score: &ParsedScore, selection: Option<&[usize]>) -> Vec<usize> {
    score
        .pitched_tracks()
        .into_iter()
        .filter(|i| selection.map_or(true, |s| s.contains(i)))
        .collect()
}

/// Chroma extraction and key analysis over the selected tracks.
fn key_analysis(
    score: &ParsedScore,
    tempo_map: &TempoMap,
    tracks: Vec<usize>,
    params: &KeyAnalysisParams,
) -> KeyAnalysis {
    let chroma = compute_chroma(
        &score.notes,
        tempo_map,
        &TrackFilter::Only(tracks),
        params.frame_rate,
        params.max_frames(),
    );

    match chroma {
        Ok(chroma) => analyze_chroma(&chroma, params),
        Err(e) => {
            warn!(error = %e, "skipping key analysis");
            KeyAnalysis::unknown()
        }
    }
}

/// Run a key-analysis stage; a panic inside it yields the unknown result.
fn contained(stage: impl FnOnce() -> KeyAnalysis) -> KeyAnalysis {
    panic::catch_unwind(AssertUnwindSafe(stage)).unwrap_or_else(|payload| {
        error!(reason = %panic_message(payload.as_ref()), "key analysis failed");
        KeyAnalysis::unknown()
    })
}

/// Full file analysis. Only unparseable bytes are an error.
pub fn analyze_score(
    midi_bytes: &[u8],
    request: &ScoreRequest,
    params: &KeyAnalysisParams,
) -> crate::Result<ScoreReport> {
    let score = parse_score(midi_bytes)?;
    let tempo_map = score.tempo_map();
    let meter_map = tempo_map.meter_entries(&score.context);

    let tracks = selected_tracks(&score, request.track_selection.as_deref());
    let analysis = if tracks.is_empty() {
        info!("no pitched tracks selected, skipping key analysis");
        KeyAnalysis::unknown()
    } else {
        contained(|| key_analysis(&score, &tempo_map, tracks, params))
    };

    let initial_bpm = tempo_map.initial_bpm();
    let bpm = if initial_bpm > MIN_PLAUSIBLE_BPM {
        initial_bpm.round() as u32
    } else {
        DEFAULT_BPM
    };

    let time_signature = meter_map
        .first()
        .map(|m| m.label.clone())
        .unwrap_or_else(|| DEFAULT_TIME_SIGNATURE.to_string());

    Ok(ScoreReport {
        key: analysis.key,
        time_signature,
        bpm,
        key_timeline: analysis.key_timeline,
        tempo_map: tempo_map.entries(),
        meter_map,
        basic_stats: BasicStats {
            track_count: score.context.track_count,
            duration_seconds: score.duration_seconds(),
        },
        track_metadata: score.tracks,
        complexity: request.complexity.clone(),
        window_size: request.window_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::MAJOR_TEMPLATE;

    fn matrix(frame: [f64; 12], len: usize) -> ChromaMatrix {
        ChromaMatrix::new(vec![frame; len], 10.0)
    }

    #[test]
    fn all_silence_is_unknown() {
        let analysis = analyze_chroma(&matrix([0.0; 12], 40), &KeyAnalysisParams::default());
        assert_eq!(analysis.key, "Unknown");
        assert_eq!(analysis.key_timeline.len(), 8);
        for entry in &analysis.key_timeline {
            assert_eq!(entry.main.confidence, 0.0);
            assert_eq!(entry.main.name, "---");
        }
    }

    #[test]
    fn empty_matrix_is_unknown() {
        let analysis = analyze_chroma(&ChromaMatrix::default(), &KeyAnalysisParams::default());
        assert_eq!(analysis, KeyAnalysis::unknown());
    }

    #[test]
    fn steady_c_major_profile() {
        let analysis = analyze_chroma(&matrix(MAJOR_TEMPLATE, 30), &KeyAnalysisParams::default());
        assert_eq!(analysis.key, "C Major");
        assert_eq!(analysis.key_timeline.len(), 6);
        assert!((analysis.key_timeline[0].main.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn timeline_times_follow_output_step() {
        let params = KeyAnalysisParams {
            output_step: 4,
            ..KeyAnalysisParams::default()
        };
        let analysis = analyze_chroma(&matrix(MAJOR_TEMPLATE, 10), &params);
        let times: Vec<f64> = analysis.key_timeline.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 0.4, 0.8]);
    }

    #[test]
    fn flat_key_respells_timeline() {
        // Ab major: rotate C major up by 8
        let frame = crate::profiles::rotate(&MAJOR_TEMPLATE, 8);
        let analysis = analyze_chroma(&matrix(frame, 20), &KeyAnalysisParams::default());
        assert_eq!(analysis.key, "Ab Major");
        assert!(analysis
            .key_timeline
            .iter()
            .all(|e| e.main.name == "Ab Major"));
    }

    #[test]
    fn panicking_stage_degrades_to_unknown() {
        let analysis = contained(|| panic!("chroma blew up"));
        assert_eq!(analysis, KeyAnalysis::unknown());
    }

    #[test]
    fn contained_stage_result_passes_through() {
        let params = KeyAnalysisParams::default();
        let analysis = contained(|| analyze_chroma(&matrix(MAJOR_TEMPLATE, 10), &params));
        assert_eq!(analysis.key, "C Major");
    }

    #[test]
    fn frame_ceiling_follows_frame_rate() {
        let params = KeyAnalysisParams {
            max_analysis_seconds: 2.5,
            ..KeyAnalysisParams::default()
        };
        assert_eq!(params.max_frames(), 25);
        assert_eq!(KeyAnalysisParams::default().max_frames(), 72_000);
    }

    #[test]
    fn unparseable_bytes_error() {
        let err = analyze_score(
            b"not midi",
            &ScoreRequest::default(),
            &KeyAnalysisParams::default(),
        );
        assert!(matches!(err, Err(crate::Error::Score(_))));
    }
}
