use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::naming::{ChordNamer, DetectOptions, NamingError, TemplateNamer};
use crate::types::{ChordQuality, ChordResult, NoteInput, NO_KEY, UNKNOWN_KEY};
use crate::ResolveError;

const NOTE_NAMES_SHARP: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Full-path readings longer than this count as over-complicated.
const COMPLEX_NAME_LEN: usize = 15;

/// Peeled readings shorter than this count as clean.
const SIMPLE_NAME_LEN: usize = 10;

pub const FULL_CONFIDENCE: f64 = 0.95;
pub const PEELED_CONFIDENCE: f64 = 0.90;

/// MIDI number → sharp-spelled scientific name (`61` → `"C#4"`).
pub fn midi_to_note_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES_SHARP[(pitch % 12) as usize], octave)
}

/// Names live note sets, trying the set with and without its top note.
///
/// The namer is consulted once on the full set and, for three or more notes,
/// once more with the highest note removed. The peeled reading wins when the
/// full one reads as an over-complicated polychord and peeling yields a short,
/// clean name.
#[derive(Clone)]
pub struct ChordResolver {
    namer: Arc<dyn ChordNamer>,
    options: DetectOptions,
}

impl Default for ChordResolver {
    fn default() -> Self {
        Self::new(Arc::new(TemplateNamer))
    }
}

impl ChordResolver {
    pub fn new(namer: Arc<dyn ChordNamer>) -> Self {
        Self {
            namer,
            options: DetectOptions::default(),
        }
    }

    /// Always returns a result; internal failures become [`ChordResult::error`].
    pub fn resolve(&self, notes: &[NoteInput]) -> ChordResult {
        if notes.len() < 2 {
            return ChordResult::insufficient();
        }

        match self.try_resolve(notes) {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "chord resolution failed");
                ChordResult::error()
            }
        }
    }

    pub fn try_resolve(&self, notes: &[NoteInput]) -> Result<ChordResult, ResolveError> {
        if notes.len() < 2 {
            return Ok(ChordResult::insufficient());
        }

        if let Some(bad) = notes.iter().find(|n| n.pitch > 127) {
            return Err(ResolveError::PitchOutOfRange(bad.pitch));
        }

        let mut sorted = notes.to_vec();
        sorted.sort_by_key(|n| n.pitch);
        let all_names: Vec<String> = sorted.iter().map(|n| midi_to_note_name(n.pitch)).collect();

        let full = self.run_detect(&all_names).unwrap_or_default();

        let mut peeled_names = Vec::new();
        let mut peeled = String::new();
        if all_names.len() >= 3 {
            peeled_names = all_names[..all_names.len() - 1].to_vec();
            peeled = self.run_detect(&peeled_names).unwrap_or_default();
        }

        let use_peeled = prefer_peeled(&full, &peeled);
        let (text, used_notes, confidence) = if use_peeled {
            (peeled, peeled_names, PEELED_CONFIDENCE)
        } else {
            (full, all_names, FULL_CONFIDENCE)
        };
        debug!(peeled = use_peeled, notes = ?used_notes, "chord reading chosen");

        let aliases = split_aliases(&text);
        let Some(primary) = aliases.first().cloned() else {
            return Ok(ChordResult {
                root: letter_name(&used_notes[0]).to_string(),
                quality: None,
                name: NO_KEY.to_string(),
                aliases: vec![UNKNOWN_KEY.to_string()],
                notes: used_notes,
                type_code: "none".to_string(),
                confidence: 0.0,
            });
        };

        let quality = classify_quality(&primary);
        Ok(ChordResult {
            root: root_of(&primary).to_string(),
            quality: Some(quality),
            name: primary,
            aliases,
            notes: used_notes,
            type_code: quality.as_str().to_string(),
            confidence,
        })
    }

    /// One naming call. Failures, panics included, read as "no result".
    fn run_detect(&self, names: &[String]) -> Option<String> {
        if names.is_empty() {
            return None;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.namer.detect(names, &self.options)
        }))
        .unwrap_or_else(|payload| Err(NamingError::Panicked(panic_message(payload.as_ref()))));

        match outcome {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(notes = ?names, error = %e, "chord naming failed");
                None
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn mentions_poly(text: &str) -> bool {
    text.to_lowercase().contains("poly")
}

/// Peeled wins when full is empty, or full is complex while peeled is simple.
fn prefer_peeled(full: &str, peeled: &str) -> bool {
    if peeled.is_empty() {
        return false;
    }
    let full_complex = mentions_poly(full) || full.chars().count() > COMPLEX_NAME_LEN;
    let peeled_simple = !mentions_poly(peeled) && peeled.chars().count() < SIMPLE_NAME_LEN;
    full.is_empty() || (full_complex && peeled_simple)
}

/// Newline-separated readings, trimmed, blanks dropped.
fn split_aliases(text: &str) -> Vec<String> {
    text.replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn letter_name(note_name: &str) -> &str {
    note_name.trim_end_matches(|c: char| c.is_ascii_digit() || c == '-')
}

/// Leading note letter of a chord name, with its accidental if any.
fn root_of(name: &str) -> &str {
    let mut indices = name.char_indices().skip(1);
    match indices.next() {
        Some((i, c)) if c == '#' || c == 'b' => &name[..i + c.len_utf8()],
        Some((i, _)) => &name[..i],
        None => name,
    }
}

/// Substring rules in priority order. Approximate: any "m" outside "maj" reads as minor.
pub fn classify_quality(name: &str) -> ChordQuality {
    let lower = name.to_lowercase();
    if lower.contains("dim") {
        ChordQuality::Diminished
    } else if lower.contains("aug") {
        ChordQuality::Augmented
    } else if lower.contains("sus") {
        ChordQuality::Suspended
    } else if lower.contains("min") || (lower.contains('m') && !lower.contains("maj")) {
        ChordQuality::Minor
    } else {
        ChordQuality::Major
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Answers from a script keyed by note count; records what it was asked.
    struct Scripted {
        answers: Vec<(usize, Result<String, NamingError>)>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn new(answers: Vec<(usize, Result<String, NamingError>)>) -> Arc<Self> {
            Arc::new(Self {
                answers,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl ChordNamer for Scripted {
        fn detect(&self, names: &[String], _: &DetectOptions) -> Result<String, NamingError> {
            self.calls.lock().unwrap().push(names.to_vec());
            self.answers
                .iter()
                .find(|(n, _)| *n == names.len())
                .map(|(_, r)| r.clone())
                .unwrap_or_else(|| Err(NamingError::Unrecognized(names.to_vec())))
        }
    }

    struct Panicking;

    impl ChordNamer for Panicking {
        fn detect(&self, _: &[String], _: &DetectOptions) -> Result<String, NamingError> {
            panic!("namer blew up");
        }
    }

    fn notes(pitches: &[u8]) -> Vec<NoteInput> {
        pitches.iter().map(|&p| NoteInput::new(p)).collect()
    }

    #[test]
    fn note_names_use_sharps() {
        assert_eq!(midi_to_note_name(60), "C4");
        assert_eq!(midi_to_note_name(61), "C#4");
        assert_eq!(midi_to_note_name(0), "C-1");
        assert_eq!(midi_to_note_name(127), "G9");
    }

    #[test]
    fn c_major_triad_full_path() {
        let result = ChordResolver::default().resolve(&notes(&[67, 60, 64]));
        assert_eq!(result.root, "C");
        assert_eq!(result.name, "C");
        assert_eq!(result.quality, Some(ChordQuality::Major));
        assert_eq!(result.type_code, "major");
        assert_eq!(result.confidence, FULL_CONFIDENCE);
        assert_eq!(result.notes, vec!["C4", "E4", "G4"]);
        assert_eq!(result.aliases[0], "C");
    }

    #[test]
    fn single_note_is_insufficient() {
        let result = ChordResolver::default().resolve(&notes(&[60]));
        assert_eq!(result.name, "---");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.aliases, vec!["Unknown"]);
        assert_eq!(result.type_code, "none");
    }

    #[test]
    fn melody_over_triad_is_peeled() {
        // Cmaj7 with a D on top: no single template, peeling drops the D
        let result = ChordResolver::default().resolve(&notes(&[48, 52, 55, 59, 62]));
        assert_eq!(result.name, "Cmaj7");
        assert_eq!(result.confidence, PEELED_CONFIDENCE);
        assert_eq!(result.notes, vec!["C3", "E3", "G3", "B3"]);
    }

    #[test]
    fn peel_only_attempted_with_three_notes() {
        let namer = Scripted::new(vec![(2, Ok("C5".into()))]);
        let resolver = ChordResolver::new(namer.clone());
        resolver.resolve(&notes(&[60, 67]));
        assert_eq!(namer.calls.lock().unwrap().len(), 1);

        resolver.resolve(&notes(&[60, 64, 67]));
        let calls = namer.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], vec!["C4".to_string(), "E4".to_string()]);
    }

    #[test]
    fn failed_full_falls_back_to_peeled() {
        let namer = Scripted::new(vec![
            (3, Err(NamingError::Unrecognized(vec![]))),
            (2, Ok("Am".into())),
        ]);
        let result = ChordResolver::new(namer).resolve(&notes(&[57, 60, 61]));
        assert_eq!(result.name, "Am");
        assert_eq!(result.confidence, PEELED_CONFIDENCE);
    }

    #[test]
    fn simple_full_result_kept_over_peeled() {
        let namer = Scripted::new(vec![(3, Ok("Cadd9".into())), (2, Ok("C5".into()))]);
        let result = ChordResolver::new(namer).resolve(&notes(&[60, 62, 64]));
        assert_eq!(result.name, "Cadd9");
        assert_eq!(result.confidence, FULL_CONFIDENCE);
    }

    #[test]
    fn long_full_loses_only_to_short_peeled() {
        assert!(prefer_peeled("Gmaj7/C polychord", "C"));
        assert!(prefer_peeled("", "C"));
        assert!(prefer_peeled("Cmaj7 sort of long", "G7"));
        assert!(!prefer_peeled("Gmaj7/C polychord", "Dm7b5/Ab/C"));
        assert!(!prefer_peeled("Gmaj7/C polychord", "G/C poly"));
        assert!(!prefer_peeled("Cmaj7", "C"));
        assert!(!prefer_peeled("Cmaj7 sort of long", ""));
    }

    #[test]
    fn aliases_split_on_line_breaks() {
        let namer = Scripted::new(vec![(2, Ok("  C6 \r\n\nAm7/C\r".into()))]);
        let result = ChordResolver::new(namer).resolve(&notes(&[60, 69]));
        assert_eq!(result.aliases, vec!["C6", "Am7/C"]);
        assert_eq!(result.name, "C6");
    }

    #[test]
    fn blank_reading_yields_unknown_alias() {
        let namer = Scripted::new(vec![(2, Ok(" \n ".into()))]);
        let result = ChordResolver::new(namer).resolve(&notes(&[61, 66]));
        // no reading: zero confidence and the lowest note's letter as root, not "-"
        assert_eq!(result.name, "---");
        assert_eq!(result.aliases, vec!["Unknown"]);
        assert_eq!(result.root, "C#");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn namer_panic_is_contained() {
        let result = ChordResolver::new(Arc::new(Panicking)).resolve(&notes(&[60, 64, 67]));
        assert_eq!(result.name, "---");
        assert_eq!(result.aliases, vec!["Unknown"]);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn out_of_range_pitch_is_error_state() {
        let resolver = ChordResolver::default();
        assert!(matches!(
            resolver.try_resolve(&notes(&[60, 200])),
            Err(ResolveError::PitchOutOfRange(200))
        ));

        let result = resolver.resolve(&notes(&[60, 200]));
        assert_eq!(result.name, "Error");
        assert_eq!(result.type_code, "error");
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn root_takes_accidental() {
        assert_eq!(root_of("C#m7"), "C#");
        assert_eq!(root_of("Bbmaj7"), "Bb");
        assert_eq!(root_of("G7"), "G");
        assert_eq!(root_of("E"), "E");
    }

    #[test]
    fn quality_rule_table() {
        let cases = [
            ("C", ChordQuality::Major),
            ("Cmaj7", ChordQuality::Major),
            ("Am", ChordQuality::Minor),
            ("Am7", ChordQuality::Minor),
            ("F#min", ChordQuality::Minor),
            ("Bdim7", ChordQuality::Diminished),
            ("Bm7b5", ChordQuality::Minor),
            ("Caug", ChordQuality::Augmented),
            ("Gsus4", ChordQuality::Suspended),
            ("A#m(maj7)", ChordQuality::Major),
            ("C unison", ChordQuality::Major),
            ("G/C polychord", ChordQuality::Major),
            // incidental "m" outside "maj" reads as minor
            ("C5 omit3", ChordQuality::Minor),
            ("Gmaj7/Cm polychord", ChordQuality::Major),
        ];
        for (name, expected) in cases {
            assert_eq!(classify_quality(name), expected, "{name}");
        }
    }
}
