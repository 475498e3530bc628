use super::stride::sample_stride;
use crate::data_types::{normalize_events, is_normalized, Event, Marker, TimeRange};
use crate::scales::TrackScale;
use std::borrow::Cow;
use std::ops::Range;
use tracing::debug;

/// Groups consecutive positions into runs anchored at the run's first element.
///
/// An element joins the open run while `position - anchor < threshold`; the anchor never
/// moves, so a run spans at most `threshold` regardless of how dense its interior is.
/// Positions must be non-decreasing.
pub fn anchored_runs(positions: &[f64], threshold: f64) -> Vec<Range<usize>> {
    if positions.is_empty() {
        return Vec::new();
    }

    let mut runs = Vec::new();
    let mut run_start = 0;
    let mut anchor = positions[0];

    for (i, &pos) in positions.iter().enumerate().skip(1) {
        if pos - anchor < threshold {
            continue;
        }
        runs.push(run_start..i);
        run_start = i;
        anchor = pos;
    }
    runs.push(run_start..positions.len());

    runs
}

/// Clusters events into track markers, then down-samples to `max_markers`.
///
/// Every input event lands in exactly one marker before down-sampling, in ascending order.
/// Unsorted input or duplicate timestamps are normalized first.
pub fn cluster_events(
    events: &[Event],
    range: TimeRange,
    threshold_pct: f64,
    max_markers: usize,
) -> Vec<Marker> {
    if events.is_empty() {
        return Vec::new();
    }

    let events: Cow<'_, [Event]> = if is_normalized(events) {
        Cow::Borrowed(events)
    } else {
        Cow::Owned(normalize_events(events.to_vec()))
    };

    let positions = TrackScale::new(range).positions(&events);
    let markers: Vec<Marker> = anchored_runs(&positions, threshold_pct)
        .into_iter()
        .map(|run| {
            let count = run.len() as f64;
            let avg = positions[run.clone()].iter().sum::<f64>() / count;
            Marker::new(avg, events[run].to_vec())
        })
        .collect();

    if markers.len() > max_markers {
        debug!(
            clusters = markers.len(),
            max_markers, "down-sampling timeline markers"
        );
        return sample_stride(markers, max_markers);
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_anchor_does_not_slide() {
        // Each step is below the threshold, but the chain drifts past it from the anchor.
        let runs = anchored_runs(&[0.0, 1.5, 3.0, 4.5], 2.0);
        assert_eq!(runs, vec![0..2, 2..4]);
    }

    #[test]
    fn test_runs_distance_equal_to_threshold_splits() {
        let runs = anchored_runs(&[10.0, 12.0], 2.0);
        assert_eq!(runs, vec![0..1, 1..2]);
    }

    #[test]
    fn test_runs_zero_threshold_isolates_everything() {
        let runs = anchored_runs(&[5.0, 5.0, 5.0], 0.0);
        assert_eq!(runs.len(), 3);
    }

    #[test]
    fn test_unsorted_input_is_normalized() {
        let range = TimeRange::new(0, 1000);
        let events = vec![
            Event::new("b", 900, Default::default()),
            Event::new("a", 100, Default::default()),
        ];
        let markers = cluster_events(&events, range, 2.0, 80);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].members[0].id, "a");
        assert_eq!(markers[1].members[0].id, "b");
    }
}
