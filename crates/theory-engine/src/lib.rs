pub mod aggregate;
pub mod analyzer;
pub mod chords;
pub mod key;
pub mod naming;
pub mod profiles;
pub mod timeline;
pub mod types;

pub use aggregate::{aggregate, GlobalKey, Spelling};
pub use analyzer::{
    analyze_chroma, analyze_score, BasicStats, KeyAnalysis, KeyAnalysisParams, ScoreReport,
    ScoreRequest,
};
pub use chords::{midi_to_note_name, ChordResolver};
pub use naming::{ChordNamer, DetectOptions, NamingError, TemplateNamer};
pub use profiles::{candidates, KeyCandidate};
pub use types::{
    ChordQuality, ChordResult, FrameEstimate, KeyAlternate, KeyLabel, KeyMode, KeyTimeline,
    NoteInput, PitchClassVector,
};

use std::sync::Arc;

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("score analysis failed: {0}")]
    Score(#[from] midi_analysis::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Internal failure while resolving a live chord.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("pitch {0} is outside the MIDI range")]
    PitchOutOfRange(u8),
}

/// Entry point for both request shapes: live chord naming and file key analysis.
///
/// Holds no per-request state; share one behind an `Arc` across tasks.
#[derive(Clone)]
pub struct TheoryEngine {
    resolver: ChordResolver,
    params: KeyAnalysisParams,
}

impl Default for TheoryEngine {
    fn default() -> Self {
        Self::new(KeyAnalysisParams::default())
    }
}

impl TheoryEngine {
    /// Create with the default template namer.
    pub fn new(params: KeyAnalysisParams) -> Self {
        Self::with_namer(Arc::new(TemplateNamer), params)
    }

    /// Create with a custom chord namer.
    pub fn with_namer(namer: Arc<dyn ChordNamer>, params: KeyAnalysisParams) -> Self {
        // build the candidate table before the first request needs it
        let table = candidates();
        info!(candidates = table.len(), "theory engine ready");

        Self {
            resolver: ChordResolver::new(namer),
            params,
        }
    }

    pub fn params(&self) -> &KeyAnalysisParams {
        &self.params
    }

    pub fn resolve_chord(&self, notes: &[NoteInput]) -> ChordResult {
        self.resolver.resolve(notes)
    }

    pub fn analyze_key(&self, midi_bytes: &[u8], request: &ScoreRequest) -> Result<ScoreReport> {
        analyze_score(midi_bytes, request, &self.params)
    }
}
