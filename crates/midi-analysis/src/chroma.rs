//! Pitch-class energy ("chroma") extraction from symbolic notes.
//!
//! Produces one 12-bin column per time frame at a fixed frame rate, plus a
//! Gaussian-smoothed variant that gives each frame its harmonic context.

use serde::{Deserialize, Serialize};

use crate::note::TimedNote;
use crate::tempo::TempoMap;

/// A 12 × T pitch-class energy matrix stored column-major (one `[f64; 12]` per frame).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChromaMatrix {
    frames: Vec<[f64; 12]>,
    frame_rate: f64,
}

impl ChromaMatrix {
    pub fn new(frames: Vec<[f64; 12]>, frame_rate: f64) -> Self {
        Self { frames, frame_rate }
    }

    pub fn frames(&self) -> &[[f64; 12]] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&[f64; 12]> {
        self.frames.get(index)
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Which tracks contribute to the chroma. Percussion notes never do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackFilter {
    #[default]
    All,
    Only(Vec<usize>),
}

impl TrackFilter {
    pub fn includes(&self, track_index: usize) -> bool {
        match self {
            TrackFilter::All => true,
            TrackFilter::Only(indices) => indices.contains(&track_index),
        }
    }
}

/// Accumulate note velocities into pitch-class bins at `frame_rate` frames per second.
///
/// A note sounding from `start` to `end` seconds fills frames
/// `[floor(start·fs), floor(end·fs))`. A score needing more than
/// `max_frames` frames is rejected before anything is allocated.
pub fn compute_chroma(
    notes: &[TimedNote],
    tempo_map: &TempoMap,
    filter: &TrackFilter,
    frame_rate: f64,
    max_frames: usize,
) -> crate::Result<ChromaMatrix> {
    let spans: Vec<(usize, usize, usize, f64)> = notes
        .iter()
        .filter(|n| !n.is_percussion() && filter.includes(n.track_index))
        .map(|n| {
            let start = tempo_map.tick_to_seconds(n.onset_tick) * frame_rate;
            let end = tempo_map.tick_to_seconds(n.offset_tick) * frame_rate;
            (
                start.floor() as usize,
                end.floor() as usize,
                n.pitch_class(),
                n.velocity as f64,
            )
        })
        .collect();

    let frame_count = spans.iter().map(|&(_, end, _, _)| end).max().unwrap_or(0);
    if frame_count > max_frames {
        return Err(crate::Error::TooManyFrames {
            frames: frame_count,
            limit: max_frames,
        });
    }

    let mut frames = vec![[0.0_f64; 12]; frame_count];

    for (start, end, pc, velocity) in spans {
        for frame in frames.iter_mut().take(end).skip(start) {
            frame[pc] += velocity;
        }
    }

    Ok(ChromaMatrix::new(frames, frame_rate))
}

/// Gaussian-smooth each pitch-class row along the time axis.
///
/// Kernel radius is `floor(4·sigma + 0.5)`; borders reflect
/// (`d c b a | a b c d | d c b a`).
pub fn gaussian_smooth(matrix: &ChromaMatrix, sigma: f64) -> ChromaMatrix {
    let len = matrix.len();
    if sigma <= 0.0 || len == 0 {
        return matrix.clone();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let mut smoothed = vec![[0.0_f64; 12]; len];

    for (t, out) in smoothed.iter_mut().enumerate() {
        for (k, weight) in kernel.iter().enumerate() {
            let source = reflect(t as isize + k as isize - radius, len);
            let column = &matrix.frames[source];
            for pc in 0..12 {
                out[pc] += weight * column[pc];
            }
        }
    }

    ChromaMatrix::new(smoothed, matrix.frame_rate)
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Half-sample symmetric reflection into `0..len`.
fn reflect(mut index: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    index = index.rem_euclid(period);
    if index >= len {
        index = period - 1 - index;
    }
    index as usize
}
