use crate::data_types::{Event, TimeRange};
use crate::utils::clamp_pct;
use rayon::prelude::*;

/// Full width of the track in position units.
pub const TRACK_SPAN: f64 = 100.0;

/// Above this many events positions are computed in parallel.
const PARALLEL_THRESHOLD: usize = 50_000;

/// Linear timestamp <-> track position mapping for one time range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackScale {
    range: TimeRange,
}

impl TrackScale {
    pub fn new(range: TimeRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Maps a timestamp to [0, 100].
    ///
    /// A degenerate range (`end <= start`) puts everything at the right edge.
    pub fn map(&self, timestamp: i64) -> f64 {
        if self.range.is_degenerate() {
            return TRACK_SPAN;
        }
        // i128 keeps the subtraction exact for any pair of i64 timestamps.
        let offset = (timestamp as i128 - self.range.start as i128) as f64;
        let span = (self.range.end as i128 - self.range.start as i128) as f64;
        clamp_pct(offset / span * TRACK_SPAN)
    }

    /// Inverse of [`map`](Self::map). Positions outside [0, 100] are clamped.
    pub fn timestamp_at(&self, position: f64) -> i64 {
        if self.range.is_degenerate() {
            return self.range.end;
        }
        let pct = clamp_pct(position) / TRACK_SPAN;
        let (start, end) = (self.range.start as i128, self.range.end as i128);
        let offset = ((end - start) as f64 * pct).round() as i128;
        // f64 rounding can push the sum one ulp past `end` on wide ranges.
        (start + offset).clamp(start, end) as i64
    }

    /// Positions of every event, in input order.
    pub fn positions(&self, events: &[Event]) -> Vec<f64> {
        if events.len() >= PARALLEL_THRESHOLD {
            events.par_iter().map(|e| self.map(e.timestamp)).collect()
        } else {
            events.iter().map(|e| self.map(e.timestamp)).collect()
        }
    }
}

/// Free-function form of [`TrackScale::map`].
pub fn position(timestamp: i64, range: TimeRange) -> f64 {
    TrackScale::new(range).map(timestamp)
}
