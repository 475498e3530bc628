use serde::{Deserialize, Serialize};

/// Outcome of a backup run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotStatus {
    #[default]
    Complete,
    Partial,
    Failed,
}

/// One completed or attempted backup snapshot.
///
/// `timestamp` (ms since epoch) is the only ordering key and is unique within an event set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub timestamp: i64,
    #[serde(default)]
    pub status: SnapshotStatus,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub file_count: Option<u64>,
    #[serde(default)]
    pub changes_count: Option<u64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub path: Option<String>,
}

impl Event {
    pub fn new(id: impl Into<String>, timestamp: i64, status: SnapshotStatus) -> Self {
        Self {
            id: id.into(),
            timestamp,
            status,
            size_bytes: None,
            file_count: None,
            changes_count: None,
            duration_ms: None,
            path: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64, file_count: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self.file_count = Some(file_count);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Sorts events ascending by timestamp and drops duplicate timestamps.
/// The first occurrence of a timestamp wins.
pub fn normalize_events(mut events: Vec<Event>) -> Vec<Event> {
    // Stable sort keeps arrival order among equal timestamps.
    events.sort_by_key(|e| e.timestamp);
    events.dedup_by_key(|e| e.timestamp);
    events
}

/// Returns true if `events` is strictly ascending by timestamp.
pub fn is_normalized(events: &[Event]) -> bool {
    events.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

/// Time window projected onto the track, in ms since epoch.
///
/// `start == end` is a valid (degenerate) range. `start > end` is tolerated and treated as
/// degenerate by every consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Smallest range covering every event, or `None` for an empty slice.
    pub fn spanning(events: &[Event]) -> Option<Self> {
        let start = events.iter().map(|e| e.timestamp).min()?;
        let end = events.iter().map(|e| e.timestamp).max()?;
        Some(Self { start, end })
    }

    pub fn span(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_degenerate(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Restricts which events are active on the track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    #[default]
    All,
    Complete,
    Partial,
    Failed,
    /// Partial or failed runs.
    Unsuccessful,
}

impl StatusFilter {
    pub fn matches(&self, status: SnapshotStatus) -> bool {
        match self {
            Self::All => true,
            Self::Complete => status == SnapshotStatus::Complete,
            Self::Partial => status == SnapshotStatus::Partial,
            Self::Failed => status == SnapshotStatus::Failed,
            Self::Unsuccessful => status != SnapshotStatus::Complete,
        }
    }

    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        events
            .iter()
            .filter(|e| self.matches(e.status))
            .cloned()
            .collect()
    }
}
