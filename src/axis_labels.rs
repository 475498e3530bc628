//! Calendar-month labels for the timeline axis.
//!
//! Labels are planned independently of markers: one candidate per calendar month in the
//! range, thinned greedily so neighbours never crowd each other, then formatted according to
//! how dense the surviving set is.

use crate::data_types::{Label, TimeRange, TimelineConfig};
use crate::data_types::{DEFAULT_LABEL_MAX_POSITION_PCT, DEFAULT_LABEL_MIN_SPACING_PCT};
use crate::scales::TrackScale;
use crate::utils::date_formatter::{format_month, MonthLabelFormat};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;

/// Below this kept/spanned ratio every label carries its year.
const LOW_DENSITY: f64 = 0.3;
/// Spans of at most this many months always use full labels.
const SHORT_SPAN_MONTHS: usize = 6;

#[derive(Clone, Debug)]
struct MonthCandidate {
    start: DateTime<Tz>,
    position: f64,
    is_year_boundary: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelPlanner {
    pub min_spacing_pct: f64,
    pub max_position_pct: f64,
    pub timezone: Tz,
}

impl Default for LabelPlanner {
    fn default() -> Self {
        Self {
            min_spacing_pct: DEFAULT_LABEL_MIN_SPACING_PCT,
            max_position_pct: DEFAULT_LABEL_MAX_POSITION_PCT,
            timezone: Tz::UTC,
        }
    }
}

impl LabelPlanner {
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self {
            min_spacing_pct: config.label_min_spacing_pct,
            max_position_pct: config.label_max_position_pct,
            timezone: config.timezone,
        }
    }

    /// Plans the month labels for `range`. Degenerate or inverted ranges yield no labels.
    pub fn plan(&self, range: TimeRange) -> Vec<Label> {
        if range.is_degenerate() {
            return Vec::new();
        }

        let scale = TrackScale::new(range);
        let months = month_starts(range, self.timezone);
        let total_months = months.len();

        let candidates = months.into_iter().filter_map(|start| {
            let position = scale.map(start.timestamp_millis());
            if !(0.0..=self.max_position_pct).contains(&position) {
                return None;
            }
            Some(MonthCandidate {
                is_year_boundary: start.month() == 1,
                start,
                position,
            })
        });

        let mut kept: Vec<MonthCandidate> = Vec::new();
        for candidate in candidates {
            let keep = match kept.last() {
                None => true,
                Some(last) => {
                    candidate.is_year_boundary
                        || candidate.position - last.position >= self.min_spacing_pct
                }
            };
            if keep {
                kept.push(candidate);
            }
        }

        let density = kept.len() as f64 / total_months.max(1) as f64;
        let full_everywhere = density < LOW_DENSITY || total_months <= SHORT_SPAN_MONTHS;

        kept.into_iter()
            .enumerate()
            .map(|(i, c)| {
                let format = if full_everywhere || i == 0 || c.is_year_boundary {
                    MonthLabelFormat::Full
                } else {
                    MonthLabelFormat::Short
                };
                Label {
                    position: c.position,
                    text: format_month(&c.start, format),
                    timestamp: c.start.timestamp_millis(),
                    is_year_boundary: c.is_year_boundary,
                }
            })
            .collect()
    }
}

/// Plans labels with the default spacing, in UTC.
pub fn plan_labels(range: TimeRange) -> Vec<Label> {
    LabelPlanner::default().plan(range)
}

/// First instant of every month from the one containing `range.start` through the one
/// containing `range.end`, inclusive.
fn month_starts(range: TimeRange, tz: Tz) -> Vec<DateTime<Tz>> {
    let (Some(first), Some(last)) = (
        tz.timestamp_millis_opt(range.start).earliest(),
        tz.timestamp_millis_opt(range.end).earliest(),
    ) else {
        return Vec::new();
    };

    let last_key = (last.year(), last.month());
    let (mut year, mut month) = (first.year(), first.month());
    let mut starts = Vec::new();

    while (year, month) <= last_key {
        if let Some(start) = month_start(tz, year, month) {
            starts.push(start);
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    starts
}

fn month_start(tz: Tz, year: i32, month: u32) -> Option<DateTime<Tz>> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    // Some zones skip midnight on DST days; the first valid local hour stands in.
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
}
