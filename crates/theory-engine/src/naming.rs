//! Note-set → chord-name inference.
//!
//! The resolver treats naming as a black box behind [`ChordNamer`]; the
//! default [`TemplateNamer`] matches pitch-class sets against interval
//! templates. Every template that spells the set exactly is a reading,
//! most plausible first, one per line; a set no template spells gets its
//! closest fit, led by a polychord reading when it is large enough.

/// Options passed to every naming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    /// Render readings rooted away from the first note as slash chords.
    pub change_from_first: bool,
    /// Prefer readings rooted on the first note.
    pub original_first: bool,
    /// Name a set of one repeated pitch class instead of rejecting it.
    pub same_note_special: bool,
    /// Fall back to a polychord reading when no single template covers the set.
    pub whole_detect: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            change_from_first: true,
            original_first: true,
            same_note_special: true,
            whole_detect: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    #[error("no notes to name")]
    EmptyInput,

    #[error("invalid note name: {0}")]
    InvalidNote(String),

    #[error("no chord matches {0:?}")]
    Unrecognized(Vec<String>),

    #[error("chord namer panicked: {0}")]
    Panicked(String),
}

/// Chord-naming primitive: ordered note names in, newline-separated names out.
pub trait ChordNamer: Send + Sync {
    fn detect(&self, note_names: &[String], options: &DetectOptions)
        -> Result<String, NamingError>;
}

/// An interval template rooted at 0, as a 12-bit mask.
pub struct ChordTemplate {
    pub suffix: &'static str,
    pub intervals: u16, // bitmask: bit i set means interval i is in the template
    pub size: u32,
}

impl ChordTemplate {
    const fn new(suffix: &'static str, intervals: &[u8]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < intervals.len() {
            mask |= 1 << intervals[i];
            i += 1;
        }
        Self {
            suffix,
            intervals: mask,
            size: intervals.len() as u32,
        }
    }
}

/// All recognized chord templates, ordered by specificity (larger first for tiebreaking).
pub static TEMPLATES: &[ChordTemplate] = &[
    // 4-note chords first (more specific)
    ChordTemplate::new("7", &[0, 4, 7, 10]),
    ChordTemplate::new("maj7", &[0, 4, 7, 11]),
    ChordTemplate::new("m7", &[0, 3, 7, 10]),
    ChordTemplate::new("m(maj7)", &[0, 3, 7, 11]),
    ChordTemplate::new("dim7", &[0, 3, 6, 9]),
    ChordTemplate::new("m7b5", &[0, 3, 6, 10]),
    ChordTemplate::new("aug7", &[0, 4, 8, 10]),
    ChordTemplate::new("7sus4", &[0, 5, 7, 10]),
    ChordTemplate::new("6", &[0, 4, 7, 9]),
    ChordTemplate::new("m6", &[0, 3, 7, 9]),
    ChordTemplate::new("add9", &[0, 2, 4, 7]),
    // Triads
    ChordTemplate::new("", &[0, 4, 7]),
    ChordTemplate::new("m", &[0, 3, 7]),
    ChordTemplate::new("dim", &[0, 3, 6]),
    ChordTemplate::new("aug", &[0, 4, 8]),
    ChordTemplate::new("sus4", &[0, 5, 7]),
    ChordTemplate::new("sus2", &[0, 2, 7]),
    // Dyad
    ChordTemplate::new("5", &[0, 7]),
];

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Readings scoring at or below this are not offered.
const SCORE_FLOOR: f64 = 0.4;

/// At most this many names are returned per call.
const MAX_READINGS: usize = 4;

pub fn note_name(pitch_class: u8) -> &'static str {
    NOTE_NAMES_SHARP[(pitch_class % 12) as usize]
}

/// Scientific pitch name (`"C#4"`, `"Eb3"`, `"B-1"`) → MIDI number.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave.parse().ok()?;
    let midi = (octave + 1) * 12 + base + accidental;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

/// Convert a set of pitch classes to an interval bitmask relative to a root.
fn to_interval_mask(pitch_classes: &[u8], root: u8) -> u16 {
    let mut mask = 0u16;
    for &pc in pitch_classes {
        let interval = (pc + 12 - root) % 12;
        mask |= 1 << interval;
    }
    mask
}

#[derive(Debug, Clone)]
struct Reading {
    root: u8,
    suffix: &'static str,
    score: f64,
    /// Template tones and sounding pitch classes coincide.
    exact: bool,
}

/// Score every (root, template) pair whose root is sounding.
fn readings(pitch_classes: &[u8], first: u8, options: &DetectOptions) -> Vec<Reading> {
    let mut found = Vec::new();

    for root in 0..12u8 {
        let intervals = to_interval_mask(pitch_classes, root);
        if intervals & 1 == 0 {
            continue;
        }

        for template in TEMPLATES {
            // How many template tones are present?
            let matched = (intervals & template.intervals).count_ones();
            if matched < template.size.min(2) {
                continue;
            }

            // Score: fraction of template matched, penalize extra notes
            let extra = (intervals & !template.intervals).count_ones();
            let mut score = matched as f64 / template.size as f64 - extra as f64 * 0.1;

            if options.original_first && root == first {
                score += 0.15;
            }

            // Bonus for complete match (all template tones present)
            let complete = intervals & template.intervals == template.intervals;
            if complete {
                score += 0.1;
            }

            if score > SCORE_FLOOR {
                found.push(Reading {
                    root,
                    suffix: template.suffix,
                    score,
                    exact: complete && extra == 0,
                });
            }
        }
    }

    // stable: equal scores keep root-then-template order
    found.sort_by(|a, b| b.score.total_cmp(&a.score));
    found
}

fn unique_pitch_classes(pitches: &[u8]) -> Vec<u8> {
    let mut pcs = Vec::new();
    for p in pitches {
        let pc = p % 12;
        if !pcs.contains(&pc) {
            pcs.push(pc);
        }
    }
    pcs
}

/// Template matcher over the chord vocabulary in [`TEMPLATES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNamer;

impl TemplateNamer {
    fn best_symbol(pitches: &[u8]) -> Option<String> {
        let pcs = unique_pitch_classes(pitches);
        let first = *pcs.first()?;
        let options = DetectOptions {
            change_from_first: false,
            whole_detect: false,
            ..DetectOptions::default()
        };
        readings(&pcs, first, &options)
            .first()
            .map(|r| format!("{}{}", note_name(r.root), r.suffix))
    }

    /// Split into lower and upper halves and name each on its own.
    fn polychord(pitches: &[u8]) -> Option<String> {
        let mut sorted = pitches.to_vec();
        sorted.sort_unstable();
        let (lower, upper) = sorted.split_at(sorted.len() / 2);
        let lower = Self::best_symbol(lower)?;
        let upper = Self::best_symbol(upper)?;
        Some(format!("{upper}/{lower} polychord"))
    }
}

impl ChordNamer for TemplateNamer {
    fn detect(
        &self,
        note_names: &[String],
        options: &DetectOptions,
    ) -> Result<String, NamingError> {
        if note_names.is_empty() {
            return Err(NamingError::EmptyInput);
        }

        let pitches = note_names
            .iter()
            .map(|n| parse_note_name(n).ok_or_else(|| NamingError::InvalidNote(n.clone())))
            .collect::<Result<Vec<u8>, _>>()?;

        let pcs = unique_pitch_classes(&pitches);
        let first = pcs[0];

        if pcs.len() == 1 {
            return if options.same_note_special {
                Ok(format!("{} unison", note_name(first)))
            } else {
                Err(NamingError::Unrecognized(note_names.to_vec()))
            };
        }

        let found = readings(&pcs, first, options);
        let exact: Vec<&Reading> = found.iter().filter(|r| r.exact).collect();
        let mut names: Vec<String> = Vec::new();

        if exact.is_empty() && options.whole_detect && pcs.len() >= 4 {
            if let Some(poly) = Self::polychord(&pitches) {
                names.push(poly);
            }
        }

        // exact spellings of the set are aliases; otherwise only the closest fit
        let chosen: Vec<&Reading> = if exact.is_empty() {
            found.iter().take(1).collect()
        } else {
            exact
        };

        for reading in chosen {
            let mut symbol = format!("{}{}", note_name(reading.root), reading.suffix);
            if options.change_from_first && reading.root != first {
                symbol = format!("{}/{}", symbol, note_name(first));
            }
            if !names.contains(&symbol) {
                names.push(symbol);
            }
            if names.len() == MAX_READINGS {
                break;
            }
        }

        if names.is_empty() {
            return Err(NamingError::Unrecognized(note_names.to_vec()));
        }
        Ok(names.join("\n"))
    }
}
