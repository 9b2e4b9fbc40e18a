use crate::note::TimedNote;
use crate::tempo::TempoMap;
use crate::text::decode_text;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Parsed MIDI file context: timing, format, and tempo map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiFileContext {
    pub ppq: u16,
    /// Set for SMPTE-timed files, where ticks map to seconds directly.
    pub ticks_per_second: Option<f64>,
    pub format: u8,
    pub track_count: usize,
    pub tempo_changes: Vec<TempoChange>,
    pub time_signatures: Vec<TimeSignature>,
    pub total_ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u64,
    pub microseconds_per_beat: u32,
    pub bpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSignature {
    pub tick: u64,
    pub numerator: u8,
    pub denominator: u8,
}

/// Per-track display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub index: usize,
    pub name: String,
    /// Every note in the track sits on the GM percussion channel.
    pub is_percussion: bool,
    pub note_count: usize,
    pub programs: Vec<u8>,
}

/// A fully extracted score: timing context, all notes, and track metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedScore {
    pub context: MidiFileContext,
    pub notes: Vec<TimedNote>,
    pub tracks: Vec<TrackInfo>,
}

impl ParsedScore {
    pub fn tempo_map(&self) -> TempoMap {
        TempoMap::from_context(&self.context)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.tempo_map().tick_to_seconds(self.context.total_ticks)
    }

    /// Indices of tracks that carry at least one non-percussion note.
    pub fn pitched_tracks(&self) -> Vec<usize> {
        self.tracks
            .iter()
            .filter(|t| t.note_count > 0 && !t.is_percussion)
            .map(|t| t.index)
            .collect()
    }
}

/// Parse SMF bytes and extract notes, timing context and track metadata.
pub fn parse_score(midi_bytes: &[u8]) -> crate::Result<ParsedScore> {
    let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
    if smf.tracks.is_empty() {
        return Err(crate::Error::NoTracks);
    }

    let (notes, context) = extract_notes(&smf);
    let tracks = describe_tracks(&smf, &notes);

    debug!(
        tracks = context.track_count,
        notes = notes.len(),
        ppq = context.ppq,
        "parsed score"
    );

    Ok(ParsedScore {
        context,
        notes,
        tracks,
    })
}

/// Extract all notes from a parsed SMF, pairing note-on/note-off events.
pub fn extract_notes(smf: &Smf) -> (Vec<TimedNote>, MidiFileContext) {
    let (ppq, ticks_per_second) = match smf.header.timing {
        Timing::Metrical(ticks) => (ticks.as_int(), None),
        Timing::Timecode(fps, subframe) => {
            (480, Some(fps.as_f32() as f64 * subframe as f64))
        }
    };

    let format = match smf.header.format {
        midly::Format::SingleTrack => 0,
        midly::Format::Parallel => 1,
        midly::Format::Sequential => 2,
    };

    let mut all_notes = Vec::new();
    let mut tempo_changes = Vec::new();
    let mut time_signatures = Vec::new();
    let mut total_ticks: u64 = 0;

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        // Map (channel, pitch) → Vec<(onset_tick, velocity)> for stacking
        let mut pending: HashMap<(u8, u8), Vec<(u64, u8)>> = HashMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    let usec = tempo.as_int().max(1);
                    tempo_changes.push(TempoChange {
                        tick: current_tick,
                        microseconds_per_beat: usec,
                        bpm: 60_000_000.0 / usec as f64,
                    });
                }
                TrackEventKind::Meta(MetaMessage::TimeSignature(num, denom_pow, _, _)) => {
                    time_signatures.push(TimeSignature {
                        tick: current_tick,
                        numerator: num,
                        denominator: 1u8.checked_shl(denom_pow as u32).unwrap_or(4),
                    });
                }
                TrackEventKind::Midi { channel, message } => {
                    let ch = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            pending
                                .entry((ch, key.as_int()))
                                .or_default()
                                .push((current_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            // vel=0 NoteOn is NoteOff
                            let key = (ch, key.as_int());
                            if let Some((onset, velocity)) =
                                pending.get_mut(&key).and_then(|stack| stack.pop())
                            {
                                all_notes.push(TimedNote {
                                    onset_tick: onset,
                                    offset_tick: current_tick,
                                    pitch: key.1,
                                    velocity,
                                    channel: ch,
                                    track_index,
                                });
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }

            total_ticks = total_ticks.max(current_tick);
        }

        // Close any unclosed notes at the track's final tick
        for (&(channel, pitch), stack) in &pending {
            for &(onset, velocity) in stack {
                all_notes.push(TimedNote {
                    onset_tick: onset,
                    offset_tick: current_tick,
                    pitch,
                    velocity,
                    channel,
                    track_index,
                });
            }
        }
    }

    // Sort by onset, then pitch for determinism
    all_notes.sort_by(|a, b| {
        a.onset_tick
            .cmp(&b.onset_tick)
            .then(a.pitch.cmp(&b.pitch))
            .then(a.track_index.cmp(&b.track_index))
    });

    // Deduplicate tempo changes (multiple tracks may repeat them in format 1)
    tempo_changes.sort_by_key(|t| t.tick);
    tempo_changes
        .dedup_by(|a, b| a.tick == b.tick && a.microseconds_per_beat == b.microseconds_per_beat);

    time_signatures.sort_by_key(|t| t.tick);
    time_signatures.dedup_by(|a, b| a.tick == b.tick);

    let context = MidiFileContext {
        ppq,
        ticks_per_second,
        format,
        track_count: smf.tracks.len(),
        tempo_changes,
        time_signatures,
        total_ticks,
    };

    (all_notes, context)
}

fn describe_tracks(smf: &Smf, notes: &[TimedNote]) -> Vec<TrackInfo> {
    smf.tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let mut name = None;
            let mut programs: Vec<u8> = Vec::new();

            for event in track {
                match event.kind {
                    TrackEventKind::Meta(MetaMessage::TrackName(bytes)) if name.is_none() => {
                        name = Some(decode_text(bytes));
                    }
                    TrackEventKind::Midi {
                        message: MidiMessage::ProgramChange { program },
                        ..
                    } => {
                        let p = program.as_int();
                        if !programs.contains(&p) {
                            programs.push(p);
                        }
                    }
                    _ => {}
                }
            }

            let track_notes: Vec<&TimedNote> =
                notes.iter().filter(|n| n.track_index == index).collect();
            let is_percussion =
                !track_notes.is_empty() && track_notes.iter().all(|n| n.is_percussion());

            TrackInfo {
                index,
                name: name.unwrap_or_else(|| format!("Track {}", index + 1)),
                is_percussion,
                note_count: track_notes.len(),
                programs,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Wrap raw track bodies into a format-1 SMF at the given PPQ.
    pub fn smf(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"MThd");
        buf.extend_from_slice(&6u32.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        buf.extend_from_slice(&ppq.to_be_bytes());

        for track in tracks {
            let mut body = track.clone();
            body.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
            buf.extend_from_slice(b"MTrk");
            buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
            buf.extend_from_slice(&body);
        }

        buf
    }

    /// Tempo track: 120 BPM, 4/4.
    pub fn conductor() -> Vec<u8> {
        let mut track = Vec::new();
        track.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]);
        track.extend_from_slice(&[0x00, 0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08]);
        track
    }

    /// C4, E4, G4 in sequence, one beat (480 ticks) each, on channel 0.
    pub fn arpeggio() -> Vec<u8> {
        let mut track = Vec::new();
        for pitch in [60u8, 64, 67] {
            track.extend_from_slice(&[0x00, 0x90, pitch, 100]);
            track.extend_from_slice(&[0x83, 0x60, 0x80, pitch, 0]);
        }
        track
    }
}
