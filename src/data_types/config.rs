use chrono_tz::Tz;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLUSTER_THRESHOLD_PCT: f64 = 2.0;
pub const DEFAULT_MAX_MARKERS: usize = 80;
pub const DEFAULT_LABEL_MIN_SPACING_PCT: f64 = 8.0;
pub const DEFAULT_LABEL_MAX_POSITION_PCT: f64 = 95.0;
pub const DEFAULT_SNAP_DISTANCE_PCT: f64 = 5.0;
pub const DEFAULT_ANALYTICS_LIMIT: usize = 10;

/// Tuning for the timeline track. All distances are in track percent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub cluster_threshold_pct: f64,
    pub max_markers: usize,
    pub label_min_spacing_pct: f64,
    /// Labels past this position are dropped; the end of the track holds the "now" marker.
    pub label_max_position_pct: f64,
    pub snap_distance_pct: f64,
    pub analytics_limit: usize,
    /// `None` keeps every analytics entry for the session.
    pub analytics_cache_capacity: Option<usize>,
    pub timezone: Tz,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            cluster_threshold_pct: DEFAULT_CLUSTER_THRESHOLD_PCT,
            max_markers: DEFAULT_MAX_MARKERS,
            label_min_spacing_pct: DEFAULT_LABEL_MIN_SPACING_PCT,
            label_max_position_pct: DEFAULT_LABEL_MAX_POSITION_PCT,
            snap_distance_pct: DEFAULT_SNAP_DISTANCE_PCT,
            analytics_limit: DEFAULT_ANALYTICS_LIMIT,
            analytics_cache_capacity: None,
            timezone: Tz::UTC,
        }
    }
}

impl TimelineConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).wrap_err("Failed to parse timeline config")?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).wrap_err("Failed to serialize timeline config")
    }

    /// Replaces non-finite or negative distances with their defaults.
    pub fn sanitized(mut self) -> Self {
        fn fix(value: f64, default: f64) -> f64 {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                default
            }
        }

        self.cluster_threshold_pct = fix(self.cluster_threshold_pct, DEFAULT_CLUSTER_THRESHOLD_PCT);
        self.label_min_spacing_pct = fix(self.label_min_spacing_pct, DEFAULT_LABEL_MIN_SPACING_PCT);
        self.label_max_position_pct = fix(self.label_max_position_pct, DEFAULT_LABEL_MAX_POSITION_PCT)
            .min(100.0);
        self.snap_distance_pct = fix(self.snap_distance_pct, DEFAULT_SNAP_DISTANCE_PCT);
        self
    }
}
