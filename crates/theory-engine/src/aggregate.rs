//! Global key by confidence-weighted vote, then enharmonic re-spelling.

use serde::{Deserialize, Serialize};

use crate::types::{FrameEstimate, KeyMode, KeyTimeline, UNKNOWN_KEY};

const NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const NAMES_FLAT: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Roots conventionally written with flats: F, Bb, Eb, Ab.
const FLAT_ROOTS: [u8; 4] = [5, 10, 3, 8];

/// Accidental preference for displaying a whole piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spelling {
    Sharps,
    Flats,
}

impl Spelling {
    /// Circle-of-fifths preference for a global key.
    ///
    /// Db/C# is the one ambiguous tonic: C# minor but Db major.
    pub fn for_key(root: u8, mode: KeyMode) -> Self {
        match root {
            1 if mode == KeyMode::Minor => Spelling::Sharps,
            1 => Spelling::Flats,
            r if FLAT_ROOTS.contains(&r) => Spelling::Flats,
            _ => Spelling::Sharps,
        }
    }

    pub fn note_name(&self, pitch_class: u8) -> &'static str {
        let idx = (pitch_class % 12) as usize;
        match self {
            Spelling::Sharps => NAMES_SHARP[idx],
            Spelling::Flats => NAMES_FLAT[idx],
        }
    }

    pub fn key_name(&self, root: u8, mode: KeyMode) -> String {
        format!("{} {}", self.note_name(root), mode)
    }
}

/// Result of aggregating a smoothed timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalKey {
    /// Display name, or `"Unknown"` when no frame voted.
    pub name: String,
    pub key: Option<(u8, KeyMode)>,
    pub spelling: Option<Spelling>,
    pub timeline: KeyTimeline,
}

/// Accumulate `confidence³` per `(root, mode)` over positive-confidence frames.
///
/// Returns the heaviest pair; ties go to the pair that appeared first.
pub fn vote(timeline: &[FrameEstimate]) -> Option<(u8, KeyMode)> {
    let mut pool: Vec<((u8, KeyMode), f64)> = Vec::new();

    for frame in timeline.iter().filter(|f| f.main.confidence > 0.0) {
        let Some(key) = frame.main.key() else {
            continue;
        };
        let weight = frame.main.confidence.powi(3);
        match pool.iter_mut().find(|(k, _)| *k == key) {
            Some((_, total)) => *total += weight,
            None => pool.push((key, weight)),
        }
    }

    let mut winner: Option<((u8, KeyMode), f64)> = None;
    for (key, total) in pool {
        if winner.map_or(true, |(_, best)| total > best) {
            winner = Some((key, total));
        }
    }
    winner.map(|(key, _)| key)
}

/// Rewrite the display name of every keyed entry with `spelling`.
///
/// Root and mode fields are untouched; silent entries keep `"---"`.
pub fn respell(timeline: &[FrameEstimate], spelling: Spelling) -> KeyTimeline {
    timeline
        .iter()
        .map(|frame| {
            let mut frame = frame.clone();
            if let Some((root, mode)) = frame.main.key() {
                frame.main.name = spelling.key_name(root, mode);
            }
            frame
        })
        .collect()
}

/// Vote for the global key and spell the whole timeline to match it.
pub fn aggregate(timeline: KeyTimeline) -> GlobalKey {
    match vote(&timeline) {
        Some((root, mode)) => {
            let spelling = Spelling::for_key(root, mode);
            GlobalKey {
                name: spelling.key_name(root, mode),
                key: Some((root, mode)),
                spelling: Some(spelling),
                timeline: respell(&timeline, spelling),
            }
        }
        None => GlobalKey {
            name: UNKNOWN_KEY.to_string(),
            key: None,
            spelling: None,
            timeline,
        },
    }
}
