pub mod analyze;
pub mod chroma;
pub mod note;
pub mod tempo;
pub mod text;

pub use analyze::{
    parse_score, MidiFileContext, ParsedScore, TempoChange, TimeSignature, TrackInfo,
};
pub use chroma::{compute_chroma, gaussian_smooth, ChromaMatrix, TrackFilter};
pub use note::TimedNote;
pub use tempo::{MeterEntry, TempoEntry, TempoMap};
pub use text::decode_text;

/// Errors from MIDI analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("MIDI file contains no tracks")]
    NoTracks,

    #[error("score needs {frames} chroma frames, limit is {limit}")]
    TooManyFrames { frames: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
