use crate::profiles::KeyCandidate;
use crate::types::{FrameEstimate, KeyAlternate, KeyLabel, PitchClassVector};

/// Frames whose L2 norm does not exceed this carry no usable pitch content.
pub const SILENCE_THRESHOLD: f64 = 0.01;

/// Runner-up keys reported per frame.
pub const MAX_ALTERNATES: usize = 3;

/// Score one pitch-class frame against every key candidate.
///
/// Near-silent frames yield a zero-confidence `"---"` estimate. Otherwise the
/// frame is L2-normalized and correlated (Pearson) with each candidate's
/// profile; candidates with an undefined correlation are dropped, the rest
/// ranked best first. Confidences are the raw signed coefficients.
pub fn score_frame(
    time: f64,
    vector: &PitchClassVector,
    candidates: &[KeyCandidate],
) -> FrameEstimate {
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if !(norm > SILENCE_THRESHOLD) {
        return FrameEstimate::silent(time);
    }

    let normalized = vector.map(|v| v / norm);

    let mut scored: Vec<(&KeyCandidate, f64)> = candidates
        .iter()
        .filter_map(|c| pearson(&normalized, &c.profile).map(|r| (c, r)))
        .collect();
    // stable: equal correlations keep candidate-table order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let Some(((top, top_corr), rest)) = scored.split_first() else {
        return FrameEstimate::silent(time);
    };

    FrameEstimate {
        time,
        main: KeyLabel {
            name: top.name.clone(),
            confidence: *top_corr,
            root: Some(top.root),
            mode: Some(top.mode),
        },
        alternates: rest
            .iter()
            .take(MAX_ALTERNATES)
            .map(|(c, r)| KeyAlternate {
                name: c.name.clone(),
                confidence: *r,
            })
            .collect(),
    }
}

/// Pearson correlation coefficient between two 12-element arrays.
///
/// `None` when either input is constant or the result is not finite.
pub fn pearson(x: &[f64; 12], y: &[f64; 12]) -> Option<f64> {
    let x_mean: f64 = x.iter().sum::<f64>() / 12.0;
    let y_mean: f64 = y.iter().sum::<f64>() / 12.0;

    let mut num = 0.0;
    let mut x_sq = 0.0;
    let mut y_sq = 0.0;

    for i in 0..12 {
        let xd = x[i] - x_mean;
        let yd = y[i] - y_mean;
        num += xd * yd;
        x_sq += xd * xd;
        y_sq += yd * yd;
    }

    let denom = (x_sq * y_sq).sqrt();
    if denom < 1e-12 {
        return None;
    }

    let r = num / denom;
    r.is_finite().then_some(r)
}
