use crate::timeline::{
    AdjustedSlideChange, AdjustedTimeline, Fragment, Interval, SlideChange, Tolerance,
};

/// Turns raw `(a, b)` cut pairs into a sorted list of disjoint intervals.
///
/// Pairs may be inverted. Zero-length pairs are dropped, and intervals that
/// overlap or touch within `tolerance.merge` are merged.
pub fn normalize_cuts(cuts: &[(f64, f64)], tolerance: &Tolerance) -> Vec<Interval> {
    let mut segments: Vec<Interval> = cuts
        .iter()
        .filter(|(a, b)| a != b)
        .map(|&(a, b)| Interval::new(a.min(b), a.max(b)))
        .collect();
    segments.sort_by(|x, y| x.start.total_cmp(&y.start));

    let mut merged: Vec<Interval> = Vec::with_capacity(segments.len());
    for seg in segments {
        match merged.last_mut() {
            Some(last) if seg.start <= last.end + tolerance.merge => {
                last.end = last.end.max(seg.end);
            }
            _ => merged.push(seg),
        }
    }
    merged
}

/// Total duration removed by `cuts` strictly before `t`.
pub fn removed_before(cuts: &[Interval], t: f64) -> f64 {
    cuts.iter()
        .map(|cut| {
            if cut.end <= t {
                cut.duration()
            } else if cut.start < t {
                t - cut.start
            } else {
                0.0
            }
        })
        .sum()
}

/// Position of original time `t` once `cuts` are removed.
pub fn to_cut_axis(cuts: &[Interval], t: f64) -> f64 {
    (t - removed_before(cuts, t)).max(0.0)
}

/// Moves slide changes from the original axis onto the cut axis.
///
/// `cuts` must already be normalized. A change that falls inside a cut is
/// pulled to the start of that cut. Changes that land on the same cut-axis
/// instant as an earlier one are dropped and counted.
pub fn adjust_timeline(
    changes: &[SlideChange],
    cuts: &[Interval],
    audio_duration: f64,
    tolerance: &Tolerance,
) -> AdjustedTimeline {
    let mut mapped: Vec<AdjustedSlideChange> = changes
        .iter()
        .map(|change| {
            let t = snap_to_cut(change.t.min(audio_duration).max(0.0), cuts, tolerance);
            AdjustedSlideChange {
                t: to_cut_axis(cuts, t),
                page: change.page,
            }
        })
        .collect();
    mapped.sort_by(|a, b| a.t.total_cmp(&b.t));

    // A negative or NaN gap would let equal instants through.
    let min_gap = tolerance.monotonic.max(0.0);
    let mut timeline = AdjustedTimeline::default();
    let mut last_t = f64::NEG_INFINITY;
    for change in mapped {
        if change.t > last_t + min_gap {
            last_t = change.t;
            timeline.changes.push(change);
        } else {
            timeline.dropped += 1;
        }
    }
    timeline
}

fn snap_to_cut(t: f64, cuts: &[Interval], tolerance: &Tolerance) -> f64 {
    cuts.iter()
        .find(|cut| (cut.start < t && t < cut.end) || (t - cut.start).abs() < tolerance.snap)
        .map_or(t, |cut| cut.start)
}

/// The parts of `[0, audio_duration]` that survive `cuts`, in order.
pub fn split_fragments(cuts: &[Interval], audio_duration: f64) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut cursor = 0.0_f64;
    for cut in cuts {
        if cursor >= audio_duration {
            break;
        }
        if cursor < cut.start {
            fragments.push(Fragment::new(cursor, cut.start.min(audio_duration)));
        }
        cursor = cursor.max(cut.end);
    }
    if cursor < audio_duration {
        fragments.push(Fragment::new(cursor, audio_duration));
    }
    fragments
}
