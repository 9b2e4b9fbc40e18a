use crate::types::{FrameEstimate, KeyTimeline};

/// Default majority-vote window, in timeline frames.
pub const DEFAULT_WINDOW: usize = 5;

/// Remove isolated key flips by a sliding-window majority vote on `main.name`.
///
/// Each frame looks at `[i - w/2, i + w/2]` (clipped to the timeline). When the
/// window's most common name differs from the frame's own, the frame takes a
/// copy of the `main` block of the first window entry carrying the winning
/// name; its time and alternates are kept. Vote ties go to the name seen first
/// in the window. Timelines shorter than the window are returned as-is.
///
/// Every window reads the unsmoothed input, so one pass is order-independent.
pub fn smooth_timeline(timeline: &[FrameEstimate], window: usize) -> KeyTimeline {
    if timeline.len() < window {
        return timeline.to_vec();
    }

    let half = window / 2;

    timeline
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(timeline.len());
            let slice = &timeline[start..end];

            let replacement = majority_name(slice)
                .filter(|winner| *winner != frame.main.name)
                .and_then(|winner| slice.iter().find(|f| f.main.name == winner));

            match replacement {
                Some(best) => FrameEstimate {
                    main: best.main.clone(),
                    ..frame.clone()
                },
                None => frame.clone(),
            }
        })
        .collect()
}

/// Most frequent `main.name` in the slice; ties resolve to the earliest seen.
fn majority_name(slice: &[FrameEstimate]) -> Option<&str> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for frame in slice {
        let name = frame.main.name.as_str();
        match tally.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => tally.push((name, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyAlternate, KeyLabel, KeyMode};
    use pretty_assertions::assert_eq;

    fn frame(time: f64, root: u8, confidence: f64) -> FrameEstimate {
        let names = ["C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B"];
        FrameEstimate {
            time,
            main: KeyLabel {
                name: format!("{} Major", names[root as usize]),
                confidence,
                root: Some(root),
                mode: Some(KeyMode::Major),
            },
            alternates: vec![KeyAlternate {
                name: "A Minor".into(),
                confidence: confidence - 0.1,
            }],
        }
    }

    fn names(timeline: &[FrameEstimate]) -> Vec<&str> {
        timeline.iter().map(|f| f.main.name.as_str()).collect()
    }

    #[test]
    fn uniform_timeline_unchanged() {
        let timeline: Vec<_> = (0..8).map(|i| frame(i as f64, 7, 0.8)).collect();
        assert_eq!(smooth_timeline(&timeline, 5), timeline);
    }

    #[test]
    fn short_timeline_returned_identically() {
        let timeline = vec![frame(0.0, 0, 0.9), frame(0.5, 7, 0.4), frame(1.0, 2, 0.7)];
        assert_eq!(smooth_timeline(&timeline, 5), timeline);
    }

    #[test]
    fn isolated_flip_replaced_by_first_winning_entry() {
        let timeline = vec![
            frame(0.0, 0, 0.91),
            frame(0.5, 0, 0.82),
            frame(1.0, 7, 0.95),
            frame(1.5, 0, 0.73),
            frame(2.0, 0, 0.64),
        ];
        let smoothed = smooth_timeline(&timeline, 5);

        assert_eq!(names(&smoothed), vec!["C Major"; 5]);
        // copied from the first C Major entry in frame 2's window, not averaged
        assert_eq!(smoothed[2].main.confidence, 0.91);
        assert_eq!(smoothed[2].time, 1.0);
        assert_eq!(smoothed[2].alternates, timeline[2].alternates);
    }

    #[test]
    fn windows_read_the_unsmoothed_input() {
        let timeline = vec![
            frame(0.0, 7, 0.5),
            frame(0.5, 0, 0.5),
            frame(1.0, 0, 0.5),
            frame(1.5, 2, 0.5),
            frame(2.0, 2, 0.5),
            frame(2.5, 2, 0.5),
        ];
        let smoothed = smooth_timeline(&timeline, 5);
        assert_eq!(
            names(&smoothed),
            vec!["C Major", "C Major", "C Major", "D Major", "D Major", "D Major"]
        );
    }

    #[test]
    fn tie_goes_to_first_seen_name() {
        // window of frame 1 is [G, C, C, G]: 2-2 tie, G seen first
        let timeline = vec![
            frame(0.0, 7, 0.5),
            frame(0.5, 0, 0.6),
            frame(1.0, 0, 0.6),
            frame(1.5, 7, 0.7),
            frame(2.0, 2, 0.5),
        ];
        let smoothed = smooth_timeline(&timeline, 5);
        assert_eq!(smoothed[1].main.name, "G Major");
        assert_eq!(smoothed[1].main.confidence, 0.5);
    }
}
