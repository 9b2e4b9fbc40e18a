use serde::{Deserialize, Serialize};

use crate::analyze::MidiFileContext;

/// Tempo before the first tempo event: 120 BPM.
pub const DEFAULT_MICROSECONDS_PER_BEAT: u32 = 500_000;

/// One point of the tempo curve, in wall-clock seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoEntry {
    pub time: f64,
    pub bpm: u32,
}

/// One time-signature change, in wall-clock seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterEntry {
    pub time: f64,
    pub numerator: u8,
    pub denominator: u8,
    #[serde(rename = "str")]
    pub label: String,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    tick: u64,
    seconds: f64,
    /// seconds = ticks · scale / divisor, kept apart so whole-beat positions stay exact
    scale: f64,
    divisor: f64,
    microseconds_per_beat: u32,
}

impl Segment {
    fn seconds_at(&self, tick: u64) -> f64 {
        self.seconds + tick.saturating_sub(self.tick) as f64 * self.scale / self.divisor
    }
}

/// Piecewise-linear tick → seconds mapping built from a file's tempo events.
#[derive(Debug, Clone)]
pub struct TempoMap {
    segments: Vec<Segment>,
}

impl TempoMap {
    pub fn from_context(context: &MidiFileContext) -> Self {
        if let Some(tps) = context.ticks_per_second.filter(|t| *t > 0.0) {
            return Self {
                segments: vec![Segment {
                    tick: 0,
                    seconds: 0.0,
                    scale: 1.0,
                    divisor: tps,
                    microseconds_per_beat: DEFAULT_MICROSECONDS_PER_BEAT,
                }],
            };
        }

        let divisor = 1_000_000.0 * context.ppq.max(1) as f64;

        let mut segments = vec![Segment {
            tick: 0,
            seconds: 0.0,
            scale: DEFAULT_MICROSECONDS_PER_BEAT as f64,
            divisor,
            microseconds_per_beat: DEFAULT_MICROSECONDS_PER_BEAT,
        }];

        for change in &context.tempo_changes {
            let Some(last) = segments.last().copied() else {
                continue;
            };
            let segment = Segment {
                tick: change.tick,
                seconds: last.seconds_at(change.tick),
                scale: change.microseconds_per_beat as f64,
                divisor,
                microseconds_per_beat: change.microseconds_per_beat,
            };

            if change.tick == last.tick {
                // a later event at the same tick replaces the earlier one
                segments.pop();
            }
            segments.push(segment);
        }

        Self { segments }
    }

    pub fn tick_to_seconds(&self, tick: u64) -> f64 {
        let idx = self.segments.partition_point(|s| s.tick <= tick);
        match self.segments.get(idx.saturating_sub(1)) {
            Some(s) => s.seconds_at(tick),
            None => 0.0,
        }
    }

    /// Tempo curve as `(time, rounded bpm)` points, starting at time 0.
    pub fn entries(&self) -> Vec<TempoEntry> {
        self.segments
            .iter()
            .map(|s| TempoEntry {
                time: s.seconds,
                bpm: (60_000_000.0 / s.microseconds_per_beat as f64).round() as u32,
            })
            .collect()
    }

    /// Tempo in effect at the start of the piece.
    pub fn initial_bpm(&self) -> f64 {
        self.segments
            .first()
            .map(|s| 60_000_000.0 / s.microseconds_per_beat as f64)
            .unwrap_or(120.0)
    }

    /// Time-signature changes positioned in seconds.
    pub fn meter_entries(&self, context: &MidiFileContext) -> Vec<MeterEntry> {
        context
            .time_signatures
            .iter()
            .map(|ts| MeterEntry {
                time: self.tick_to_seconds(ts.tick),
                numerator: ts.numerator,
                denominator: ts.denominator,
                label: format!("{}/{}", ts.numerator, ts.denominator),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{TempoChange, TimeSignature};

    fn context(tempo_changes: Vec<TempoChange>) -> MidiFileContext {
        MidiFileContext {
            ppq: 480,
            ticks_per_second: None,
            format: 1,
            track_count: 1,
            tempo_changes,
            time_signatures: vec![TimeSignature {
                tick: 1920,
                numerator: 3,
                denominator: 4,
            }],
            total_ticks: 3840,
        }
    }

    fn tempo(tick: u64, bpm: f64) -> TempoChange {
        let usec = (60_000_000.0 / bpm) as u32;
        TempoChange {
            tick,
            microseconds_per_beat: usec,
            bpm,
        }
    }

    #[test]
    fn default_tempo_without_events() {
        let map = TempoMap::from_context(&context(vec![]));
        assert!((map.tick_to_seconds(480) - 0.5).abs() < 1e-9);
        assert_eq!(map.entries(), vec![TempoEntry { time: 0.0, bpm: 120 }]);
    }

    #[test]
    fn tempo_change_midway() {
        // 120 BPM for 4 beats, then 60 BPM
        let map = TempoMap::from_context(&context(vec![tempo(0, 120.0), tempo(1920, 60.0)]));
        assert!((map.tick_to_seconds(1920) - 2.0).abs() < 1e-9);
        assert!((map.tick_to_seconds(2400) - 3.0).abs() < 1e-9);

        let entries = map.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].bpm, 60);
        assert!((entries[1].time - 2.0).abs() < 1e-9);
    }

    #[test]
    fn meter_positioned_in_seconds() {
        let ctx = context(vec![tempo(0, 120.0)]);
        let map = TempoMap::from_context(&ctx);
        let meters = map.meter_entries(&ctx);
        assert_eq!(meters.len(), 1);
        assert_eq!(meters[0].label, "3/4");
        assert!((meters[0].time - 2.0).abs() < 1e-9);
    }

    #[test]
    fn timecode_ticks_are_seconds_based() {
        let mut ctx = context(vec![]);
        ctx.ticks_per_second = Some(1000.0);
        let map = TempoMap::from_context(&ctx);
        assert!((map.tick_to_seconds(2500) - 2.5).abs() < 1e-9);
    }
}
