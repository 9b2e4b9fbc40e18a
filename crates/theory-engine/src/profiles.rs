//! The 24 reference key profiles (12 tonics × major/minor).

use std::sync::OnceLock;

use crate::types::{KeyMode, PitchClassVector};

/// Tonal-hierarchy weights for a major key with tonic at index 0.
pub const MAJOR_TEMPLATE: PitchClassVector =
    [5.0, 2.0, 3.5, 2.0, 4.5, 4.0, 2.0, 4.5, 2.0, 3.5, 1.5, 4.0];

/// Tonal-hierarchy weights for a minor key with tonic at index 0.
pub const MINOR_TEMPLATE: PitchClassVector =
    [5.0, 2.0, 3.5, 4.5, 2.0, 4.0, 2.0, 4.5, 3.5, 2.0, 1.5, 4.0];

/// Raw candidate spelling; the timeline is re-spelled once the global key is known.
const CANDIDATE_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

#[derive(Debug, Clone, PartialEq)]
pub struct KeyCandidate {
    pub name: String,
    pub profile: PitchClassVector,
    pub root: u8,
    pub mode: KeyMode,
}

pub fn template(mode: KeyMode) -> &'static PitchClassVector {
    match mode {
        KeyMode::Major => &MAJOR_TEMPLATE,
        KeyMode::Minor => &MINOR_TEMPLATE,
    }
}

/// Shift `vector` right by `by` bins so that index 0 lands on index `by`.
pub fn rotate(vector: &PitchClassVector, by: usize) -> PitchClassVector {
    let mut rotated = [0.0; 12];
    for (i, value) in vector.iter().enumerate() {
        rotated[(i + by) % 12] = *value;
    }
    rotated
}

/// Build all candidates: for each root 0..12, major then minor.
pub fn generate_candidates() -> Vec<KeyCandidate> {
    let mut candidates = Vec::with_capacity(24);
    for root in 0..12u8 {
        for mode in [KeyMode::Major, KeyMode::Minor] {
            candidates.push(KeyCandidate {
                name: format!("{} {}", CANDIDATE_NAMES[root as usize], mode),
                profile: rotate(template(mode), root as usize),
                root,
                mode,
            });
        }
    }
    candidates
}

/// Process-wide candidate table, built on first use and shared read-only.
pub fn candidates() -> &'static [KeyCandidate] {
    static CANDIDATES: OnceLock<Vec<KeyCandidate>> = OnceLock::new();
    CANDIDATES.get_or_init(generate_candidates)
}
