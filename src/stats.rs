use crate::data_types::Event;
use chrono::TimeZone;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Totals over an event set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_snapshots: u64,
    /// Logical size, not deduplicated across snapshots.
    pub total_size_bytes: u64,
    pub total_files: u64,
    pub first_snapshot_ms: Option<i64>,
    pub last_snapshot_ms: Option<i64>,
}

pub fn aggregate_stats(events: &[Event]) -> AggregateStats {
    AggregateStats {
        total_snapshots: events.len() as u64,
        total_size_bytes: events
            .iter()
            .filter_map(|e| e.size_bytes)
            .fold(0, u64::saturating_add),
        total_files: events
            .iter()
            .filter_map(|e| e.file_count)
            .fold(0, u64::saturating_add),
        first_snapshot_ms: events.iter().map(|e| e.timestamp).min(),
        last_snapshot_ms: events.iter().map(|e| e.timestamp).max(),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DensityPeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl DensityPeriod {
    fn pattern(&self) -> &'static str {
        match self {
            Self::Day => "%Y-%m-%d",
            Self::Week => "%Y-W%W",
            Self::Month => "%Y-%m",
            Self::Year => "%Y",
        }
    }
}

/// Snapshot count and size for one calendar period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDensity {
    /// e.g. "2024-01" for a month, "2024-01-15" for a day.
    pub period: String,
    pub count: u64,
    pub total_size: u64,
}

/// Buckets events by calendar period in `tz`, newest period first.
pub fn snapshot_density(events: &[Event], period: DensityPeriod, tz: Tz) -> Vec<SnapshotDensity> {
    let mut buckets: BTreeMap<String, (u64, u64)> = BTreeMap::new();

    for event in events {
        let Some(dt) = tz.timestamp_millis_opt(event.timestamp).earliest() else {
            continue;
        };
        let entry = buckets
            .entry(dt.format(period.pattern()).to_string())
            .or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(event.size_bytes.unwrap_or(0));
    }

    // Period keys are zero-padded, so lexical order is chronological.
    buckets
        .into_iter()
        .rev()
        .map(|(period, (count, total_size))| SnapshotDensity {
            period,
            count,
            total_size,
        })
        .collect()
}
